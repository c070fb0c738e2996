//! Selection of the entries a report asks for, with timestamp parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::warn;

use crate::error::ExtractError;
use crate::models::{Entry, RawEntry};

/// Timestamp layout used by every date attribute of the export
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses an export timestamp, keeping the wall-clock time as recorded.
///
/// `"2025-11-28 06:18:00 +0100"` becomes `2025-11-28T06:18:00`; the offset is
/// validated but not applied. Values without an offset are accepted as well.
pub fn parse_export_timestamp(value: &str) -> Result<NaiveDateTime, ExtractError> {
    let trimmed = value.trim();
    if let Ok(with_offset) = DateTime::parse_from_str(trimmed, EXPORT_TIMESTAMP_FORMAT) {
        return Ok(with_offset.naive_local());
    }
    NaiveDateTime::parse_from_str(trimmed, NAIVE_TIMESTAMP_FORMAT).map_err(|_| {
        ExtractError::InvalidTimestamp {
            value: value.to_string(),
        }
    })
}

fn normalize_source(text: &str) -> String {
    text.replace('\u{a0}', " ")
}

/// Predicate describing which records and workouts a report wants
#[derive(Debug, Clone, Default)]
pub struct Selector {
    record_types: Vec<String>,
    activity_types: Vec<String>,
    source_filter: Option<String>,
    since: Option<NaiveDate>,
    window: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept records of these `type` identifiers
    pub fn records<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record_types.extend(types.into_iter().map(Into::into));
        self
    }

    /// Accept workouts of these activity types
    pub fn workouts<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.activity_types.extend(types.into_iter().map(Into::into));
        self
    }

    /// Keep only entries whose source name or device mentions `needle`
    pub fn source_containing(mut self, needle: Option<&str>) -> Self {
        self.source_filter = needle
            .filter(|n| !n.trim().is_empty())
            .map(normalize_source);
        self
    }

    /// Keep only entries starting on or after this day
    pub fn since(mut self, since: Option<NaiveDate>) -> Self {
        self.since = since;
        self
    }

    /// Keep only entries whose `[start, end]` touches `[start, end]` of the window
    pub fn overlapping(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.window = Some((start, end));
        self
    }

    /// Type match only; cheap enough to run on every scanned element
    pub fn matches_type(&self, entry: &RawEntry) -> bool {
        match entry {
            RawEntry::Record(r) => self.record_types.iter().any(|t| *t == r.record_type),
            RawEntry::Workout(w) => self.activity_types.iter().any(|t| *t == w.activity_type),
        }
    }

    pub fn matches_source(&self, entry: &RawEntry) -> bool {
        let Some(needle) = &self.source_filter else {
            return true;
        };
        let haystack = format!(
            "{} {}",
            entry.source_name().unwrap_or_default(),
            entry.device().unwrap_or_default()
        );
        normalize_source(&haystack).contains(needle.as_str())
    }

    pub fn matches_range(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        if let Some(since) = self.since {
            if start.date() < since {
                return false;
            }
        }
        if let Some((window_start, window_end)) = self.window {
            if start > window_end || end < window_start {
                return false;
            }
        }
        true
    }
}

/// Counters surfaced in each report's summary line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub scanned: u64,
    pub matched: u64,
    pub skipped_timestamp: u64,
    pub skipped_source: u64,
    pub skipped_range: u64,
}

impl ExtractStats {
    /// Combines the counters of several scans of the same report
    pub fn merge(&mut self, other: &ExtractStats) {
        self.scanned += other.scanned;
        self.matched += other.matched;
        self.skipped_timestamp += other.skipped_timestamp;
        self.skipped_source += other.skipped_source;
        self.skipped_range += other.skipped_range;
    }
}

/// Filters a raw entry stream down to timed [`Entry`] values.
///
/// Entries with an unparseable timestamp are logged and counted, never fatal.
/// XML errors from the underlying stream are passed through and end the scan.
pub struct Extractor<I> {
    source: I,
    selector: Selector,
    stats: ExtractStats,
}

impl<I> Extractor<I>
where
    I: Iterator<Item = Result<RawEntry, ExtractError>>,
{
    pub fn new(source: I, selector: Selector) -> Self {
        Self {
            source,
            selector,
            stats: ExtractStats::default(),
        }
    }

    pub fn stats(&self) -> ExtractStats {
        self.stats
    }

    fn timed(&mut self, raw: RawEntry) -> Option<Entry> {
        let start = match raw.start_date().map(parse_export_timestamp) {
            Some(Ok(start)) => start,
            Some(Err(e)) => {
                warn!("Skipping {} with bad start date: {}", raw_kind(&raw), e);
                self.stats.skipped_timestamp += 1;
                return None;
            }
            None => {
                warn!("Skipping {} without start date", raw_kind(&raw));
                self.stats.skipped_timestamp += 1;
                return None;
            }
        };

        // A missing end date means an instantaneous sample
        let end = match raw.end_date().map(parse_export_timestamp) {
            Some(Ok(end)) => end,
            Some(Err(e)) => {
                warn!("Skipping {} with bad end date: {}", raw_kind(&raw), e);
                self.stats.skipped_timestamp += 1;
                return None;
            }
            None => start,
        };

        if !self.selector.matches_range(start, end) {
            self.stats.skipped_range += 1;
            return None;
        }

        Some(Entry { raw, start, end })
    }
}

fn raw_kind(raw: &RawEntry) -> &str {
    match raw {
        RawEntry::Record(r) => &r.record_type,
        RawEntry::Workout(w) => &w.activity_type,
    }
}

impl<I> Iterator for Extractor<I>
where
    I: Iterator<Item = Result<RawEntry, ExtractError>>,
{
    type Item = Result<Entry, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.source.next()? {
                Ok(raw) => raw,
                Err(e) => return Some(Err(e)),
            };
            self.stats.scanned += 1;

            if !self.selector.matches_type(&raw) {
                continue;
            }
            if !self.selector.matches_source(&raw) {
                self.stats.skipped_source += 1;
                continue;
            }

            if let Some(entry) = self.timed(raw) {
                self.stats.matched += 1;
                return Some(Ok(entry));
            }
        }
    }
}
