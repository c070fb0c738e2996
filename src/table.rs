//! Typed tables keyed by timestamp.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::models::{Entry, Metric};

/// Consumer of selected entries, so that one scan can fill several tables
pub trait EntrySink {
    fn offer(&mut self, entry: &Entry);
}

/// Collects one metric out of a stream of entries.
///
/// Rows are keyed by timestamp; a later entry with the same timestamp
/// replaces the earlier one. Entries that fail coercion are counted and dropped.
#[derive(Debug, Clone)]
pub struct TableBuilder<M: Metric> {
    rows: BTreeMap<NaiveDateTime, M>,
    dropped: usize,
    duplicates: usize,
}

impl<M: Metric> Default for TableBuilder<M> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            dropped: 0,
            duplicates: 0,
        }
    }
}

impl<M: Metric> TableBuilder<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an already typed row
    pub fn push(&mut self, row: M) {
        if self.rows.insert(row.timestamp(), row).is_some() {
            self.duplicates += 1;
        }
    }

    pub fn build(self) -> Table<M> {
        debug!(
            "{} table: {} rows, {} dropped, {} duplicates",
            M::NAME,
            self.rows.len(),
            self.dropped,
            self.duplicates
        );
        Table {
            rows: self.rows.into_values().collect(),
            dropped: self.dropped,
            duplicates: self.duplicates,
        }
    }
}

impl<M: Metric> EntrySink for TableBuilder<M> {
    fn offer(&mut self, entry: &Entry) {
        if !M::accepts(entry) {
            return;
        }
        match M::from_entry(entry) {
            Ok(row) => self.push(row),
            Err(e) => {
                debug!("Dropping {} row at {}: {}", M::NAME, entry.start, e);
                self.dropped += 1;
            }
        }
    }
}

impl<M: Metric> FromIterator<M> for Table<M> {
    fn from_iter<T: IntoIterator<Item = M>>(iter: T) -> Self {
        let mut builder = TableBuilder::new();
        for row in iter {
            builder.push(row);
        }
        builder.build()
    }
}

/// Rows of one metric, sorted ascending by timestamp with unique timestamps
#[derive(Debug, Clone)]
pub struct Table<M> {
    rows: Vec<M>,
    pub dropped: usize,
    pub duplicates: usize,
}

impl<M: Metric> Table<M> {
    pub fn rows(&self) -> &[M] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Most recent row
    pub fn last(&self) -> Option<&M> {
        self.rows.last()
    }

    pub fn into_rows(self) -> Vec<M> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawEntry, RawRecord, Vo2MaxReading, BODY_MASS_TYPE, VO2_MAX_TYPE};

    fn entry(record_type: &str, start: &str, value: &str) -> Entry {
        let start = NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M:%S").unwrap();
        Entry {
            raw: RawEntry::Record(RawRecord {
                record_type: record_type.to_string(),
                value: Some(value.to_string()),
                unit: Some("mL/min·kg".to_string()),
                ..RawRecord::default()
            }),
            start,
            end: start,
        }
    }

    #[test]
    fn test_rows_sorted_and_deduplicated() {
        let mut builder = TableBuilder::<Vo2MaxReading>::new();
        builder.offer(&entry(VO2_MAX_TYPE, "2024-01-03 09:00:00", "45"));
        builder.offer(&entry(VO2_MAX_TYPE, "2024-01-01 09:00:00", "42"));
        builder.offer(&entry(VO2_MAX_TYPE, "2024-01-03 09:00:00", "46"));

        let table = builder.build();
        let values: Vec<f64> = table.rows().iter().map(|r| r.value()).collect();
        assert_eq!(values, vec![42.0, 46.0]);
        assert_eq!(table.duplicates, 1);
        assert_eq!(table.dropped, 0);
    }

    #[test]
    fn test_coercion_failures_are_counted() {
        let mut builder = TableBuilder::<Vo2MaxReading>::new();
        builder.offer(&entry(VO2_MAX_TYPE, "2024-01-01 09:00:00", "n/a"));
        builder.offer(&entry(VO2_MAX_TYPE, "2024-01-02 09:00:00", "44"));

        let table = builder.build();
        assert_eq!(table.len(), 1);
        assert_eq!(table.dropped, 1);
    }

    #[test]
    fn test_other_metrics_ignored() {
        let mut builder = TableBuilder::<Vo2MaxReading>::new();
        builder.offer(&entry(BODY_MASS_TYPE, "2024-01-01 09:00:00", "80"));

        let table = builder.build();
        assert!(table.is_empty());
        assert_eq!(table.dropped, 0);
    }
}
