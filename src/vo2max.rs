//! VO2max history and its relation to body mass
//!
//! Builds the daily VO2max series, summarizes its trend, and joins each
//! VO2max day with the most recent prior body mass day inside a bounded
//! look-back window.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::aggregate::{daily, group_by_month, nearest_prior, DailyValue, MonthKey};
use crate::models::{BodyMassReading, Metric, Reduction, Vo2MaxReading};
use crate::table::Table;

/// Minimum number of joined rows before a correlation is reported
pub const MIN_CORRELATION_ROWS: usize = 3;

/// VO2max trend analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vo2MaxTrend {
    /// Linear regression slope (ml/kg/min per day)
    pub trend_slope: f64,
    /// Average VO2max over period
    pub average_vo2max: f64,
    /// Minimum VO2max in period
    pub min_vo2max: f64,
    /// Maximum VO2max in period
    pub max_vo2max: f64,
    /// Number of days in trend
    pub day_count: usize,
    /// Date range for trend
    pub date_range: (NaiveDate, NaiveDate),
}

impl Vo2MaxTrend {
    /// Change over the whole range implied by the slope
    pub fn projected_change(&self) -> f64 {
        self.trend_slope * (self.date_range.1 - self.date_range.0).num_days() as f64
    }
}

/// VO2max analyzer for trend tracking
pub struct Vo2MaxAnalyzer;

impl Vo2MaxAnalyzer {
    /// Trend over daily values sorted by date; `None` without data
    pub fn track_vo2max_trends(days: &[DailyValue]) -> Option<Vo2MaxTrend> {
        let first = days.first()?;
        let last = days.last()?;

        let values: Vec<f64> = days.iter().map(|d| d.value).collect();
        let min_vo2max = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_vo2max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        // Convert dates to days from first date
        let x_values: Vec<f64> = days
            .iter()
            .map(|d| (d.date - first.date).num_days() as f64)
            .collect();

        // Simple linear regression: y = mx + b
        let n = x_values.len() as f64;
        let sum_x: f64 = x_values.iter().sum();
        let sum_y: f64 = values.iter().sum();
        let sum_xy: f64 = x_values.iter().zip(values.iter()).map(|(x, y)| x * y).sum();
        let sum_xx: f64 = x_values.iter().map(|x| x * x).sum();

        let denominator = n * sum_xx - sum_x * sum_x;
        let trend_slope = if denominator.abs() > 0.0001 {
            (n * sum_xy - sum_x * sum_y) / denominator
        } else {
            0.0
        };

        Some(Vo2MaxTrend {
            trend_slope,
            average_vo2max: values.iter().mean(),
            min_vo2max,
            max_vo2max,
            day_count: days.len(),
            date_range: (first.date, last.date),
        })
    }

    /// Pearson correlation of paired samples; `None` below
    /// [`MIN_CORRELATION_ROWS`] pairs or when either side is constant
    pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
        if xs.len() != ys.len() || xs.len() < MIN_CORRELATION_ROWS {
            return None;
        }
        let sx = xs.iter().std_dev();
        let sy = ys.iter().std_dev();
        if !(sx > 0.0 && sy > 0.0) {
            return None;
        }
        let r = xs.iter().covariance(ys.iter()) / (sx * sy);
        r.is_finite().then(|| r.clamp(-1.0, 1.0))
    }
}

/// One day of the VO2max history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vo2MaxDay {
    pub date: NaiveDate,
    pub vo2max: f64,
    pub readings: usize,
    /// Change from the previous day with data
    pub change: Option<f64>,
}

/// Daily VO2max values of one calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vo2MaxMonth {
    pub month: MonthKey,
    pub days: Vec<Vo2MaxDay>,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Vo2MaxReport {
    pub days: Vec<Vo2MaxDay>,
    /// The same days grouped by calendar month, oldest month first
    pub months: Vec<Vo2MaxMonth>,
    pub trend: Option<Vo2MaxTrend>,
}

fn group_months(days: &[Vo2MaxDay]) -> Vec<Vo2MaxMonth> {
    group_by_month(days, |d| d.date)
        .into_iter()
        .map(|(month, members)| {
            let values: Vec<f64> = members.iter().map(|d| d.vo2max).collect();
            Vo2MaxMonth {
                month,
                days: members.into_iter().cloned().collect(),
                mean: values.iter().mean(),
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect()
}

pub fn build_vo2max_report(table: &Table<Vo2MaxReading>, reduction: Reduction) -> Vo2MaxReport {
    let values = daily(table, reduction);
    let trend = Vo2MaxAnalyzer::track_vo2max_trends(&values);

    let mut previous: Option<f64> = None;
    let days = values
        .iter()
        .map(|d| {
            let day = Vo2MaxDay {
                date: d.date,
                vo2max: d.value,
                readings: d.count,
                change: previous.map(|p| d.value - p),
            };
            previous = Some(d.value);
            day
        })
        .collect::<Vec<_>>();

    Vo2MaxReport {
        months: group_months(&days),
        days,
        trend,
    }
}

/// One VO2max day joined with the body mass in effect on that day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightVo2Row {
    pub date: NaiveDate,
    pub vo2max: f64,
    pub weight_kg: Option<f64>,
    /// Day the weight was measured, when one was found in the window
    pub weight_date: Option<NaiveDate>,
    pub days_from_start: i64,
    pub weight_delta_kg: Option<f64>,
    pub vo2_delta: f64,
    /// VO2max gained per kilogram lost; only when weight went down
    pub vo2_gain_per_kg_lost: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeightVo2Report {
    pub rows: Vec<WeightVo2Row>,
    pub lookback_days: u32,
    /// Pearson r of VO2max against weight over rows that have a weight
    pub correlation: Option<f64>,
}

impl WeightVo2Report {
    pub fn matched_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.weight_kg.is_some()).count()
    }
}

/// Joins every VO2max day with the latest weight day no more than
/// `lookback_days` before it. Days without such a weight keep `weight_kg`
/// empty; nothing is interpolated.
pub fn correlate_weight_vo2(
    vo2: &Table<Vo2MaxReading>,
    weight: &Table<BodyMassReading>,
    vo2_reduction: Reduction,
    lookback_days: u32,
) -> WeightVo2Report {
    let vo2_days = daily(vo2, vo2_reduction);
    let weight_days = daily(weight, BodyMassReading::REDUCTION);

    let Some(first) = vo2_days.first() else {
        return WeightVo2Report {
            rows: Vec::new(),
            lookback_days,
            correlation: None,
        };
    };
    let start_date = first.date;
    let start_vo2 = first.value;

    let mut start_weight: Option<f64> = None;
    let mut rows = Vec::with_capacity(vo2_days.len());

    for day in &vo2_days {
        let weight_day = nearest_prior(&weight_days, day.date, lookback_days);
        let weight_kg = weight_day.map(|w| w.value);

        if start_weight.is_none() {
            start_weight = weight_kg;
        }

        let weight_delta_kg = match (weight_kg, start_weight) {
            (Some(w), Some(s)) => Some(w - s),
            _ => None,
        };
        let vo2_delta = day.value - start_vo2;
        let vo2_gain_per_kg_lost = weight_delta_kg
            .filter(|delta| *delta < 0.0)
            .map(|delta| vo2_delta / -delta);

        rows.push(WeightVo2Row {
            date: day.date,
            vo2max: day.value,
            weight_kg,
            weight_date: weight_day.map(|w| w.date),
            days_from_start: (day.date - start_date).num_days(),
            weight_delta_kg,
            vo2_delta,
            vo2_gain_per_kg_lost,
        });
    }

    let (weights, vo2s): (Vec<f64>, Vec<f64>) = rows
        .iter()
        .filter_map(|r| r.weight_kg.map(|w| (w, r.vo2max)))
        .unzip();

    WeightVo2Report {
        correlation: Vo2MaxAnalyzer::pearson(&vo2s, &weights),
        rows,
        lookback_days,
    }
}
