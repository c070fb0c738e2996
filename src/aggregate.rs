//! Time bucketing shared by every report.
//!
//! Weekly values are only ever derived from daily values, so a weekly sheet
//! and the daily sheet it summarizes cannot disagree.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::{Metric, Reduction};
use crate::table::Table;

/// One calendar day of a metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyValue {
    pub date: NaiveDate,
    pub value: f64,
    /// Number of rows reduced into this day
    pub count: usize,
}

/// Reduces a table to one value per calendar day, ascending by date
pub fn daily<M: Metric>(table: &Table<M>, reduction: Reduction) -> Vec<DailyValue> {
    daily_from_pairs(
        table.rows().iter().map(|row| (row.timestamp(), row.value())),
        reduction,
    )
}

/// Same as [`daily`] for bare `(timestamp, value)` pairs in chronological order
pub fn daily_from_pairs<I>(pairs: I, reduction: Reduction) -> Vec<DailyValue>
where
    I: IntoIterator<Item = (NaiveDateTime, f64)>,
{
    let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for (timestamp, value) in pairs {
        buckets.entry(timestamp.date()).or_default().push(value);
    }

    buckets
        .into_iter()
        .filter_map(|(date, values)| {
            reduction.reduce(&values).map(|value| DailyValue {
                date,
                value,
                count: values.len(),
            })
        })
        .collect()
}

/// ISO-8601 week key, ordered by year then week
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IsoWeekKey {
    pub year: i32,
    pub week: u32,
}

impl IsoWeekKey {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Monday of the week
    pub fn monday(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, chrono::Weekday::Mon)
    }
}

impl std::fmt::Display for IsoWeekKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// Groups dated items by ISO week, keeping their order within each week
pub fn group_by_week<T, F>(items: &[T], date_of: F) -> BTreeMap<IsoWeekKey, Vec<&T>>
where
    F: Fn(&T) -> NaiveDate,
{
    let mut weeks: BTreeMap<IsoWeekKey, Vec<&T>> = BTreeMap::new();
    for item in items {
        weeks.entry(IsoWeekKey::of(date_of(item))).or_default().push(item);
    }
    weeks
}

/// Calendar month key, ordered by year then month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Groups dated items by calendar month, keeping their order within each month
pub fn group_by_month<T, F>(items: &[T], date_of: F) -> BTreeMap<MonthKey, Vec<&T>>
where
    F: Fn(&T) -> NaiveDate,
{
    let mut months: BTreeMap<MonthKey, Vec<&T>> = BTreeMap::new();
    for item in items {
        months.entry(MonthKey::of(date_of(item))).or_default().push(item);
    }
    months
}

/// One ISO week derived from daily values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyValue {
    pub week: IsoWeekKey,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub days: usize,
    pub value: f64,
}

/// Reduces daily values (ascending by date) to ISO weeks
pub fn weekly(daily: &[DailyValue], reduction: Reduction) -> Vec<WeeklyValue> {
    group_by_week(daily, |d| d.date)
        .into_iter()
        .filter_map(|(week, days)| {
            let values: Vec<f64> = days.iter().map(|d| d.value).collect();
            let value = reduction.reduce(&values)?;
            Some(WeeklyValue {
                week,
                first_day: days.first()?.date,
                last_day: days.last()?.date,
                days: days.len(),
                value,
            })
        })
        .collect()
}

/// Most recent daily value on or before `date`, at most `window_days` earlier
pub fn nearest_prior(daily: &[DailyValue], date: NaiveDate, window_days: u32) -> Option<&DailyValue> {
    let earliest = date
        .checked_sub_signed(Duration::days(i64::from(window_days)))
        .unwrap_or(NaiveDate::MIN);
    let end = daily.partition_point(|d| d.date <= date);
    daily[..end].last().filter(|d| d.date >= earliest)
}

/// Union of time intervals, used to exclude workout time from ambient samples
#[derive(Debug, Clone, Default)]
pub struct TimeMask {
    intervals: Vec<(NaiveDateTime, NaiveDateTime)>,
}

impl TimeMask {
    pub fn new<I>(intervals: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDateTime, NaiveDateTime)>,
    {
        let mut sorted: Vec<_> = intervals.into_iter().filter(|(s, e)| e >= s).collect();
        sorted.sort();

        let mut merged: Vec<(NaiveDateTime, NaiveDateTime)> = Vec::with_capacity(sorted.len());
        for (start, end) in sorted {
            match merged.last_mut() {
                Some(last) if start <= last.1 => {
                    if end > last.1 {
                        last.1 = end;
                    }
                }
                _ => merged.push((start, end)),
            }
        }
        Self { intervals: merged }
    }

    pub fn intervals(&self) -> &[(NaiveDateTime, NaiveDateTime)] {
        &self.intervals
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.intervals
            .iter()
            .any(|(start, end)| *start <= instant && instant < *end)
    }

    /// Fraction of `[start, end)` not covered by the mask.
    ///
    /// An instantaneous interval is either fully kept or fully masked.
    pub fn retained_fraction(&self, start: NaiveDateTime, end: NaiveDateTime) -> f64 {
        if end <= start {
            return if self.contains(start) { 0.0 } else { 1.0 };
        }

        let total = (end - start).num_milliseconds() as f64;
        let covered: i64 = self
            .intervals
            .iter()
            .map(|(mask_start, mask_end)| {
                let overlap_start = (*mask_start).max(start);
                let overlap_end = (*mask_end).min(end);
                if overlap_end > overlap_start {
                    (overlap_end - overlap_start).num_milliseconds()
                } else {
                    0
                }
            })
            .sum();

        (1.0 - covered as f64 / total).clamp(0.0, 1.0)
    }
}
