//! Walking distance per day and per week.
//!
//! Daily totals combine walking workouts with ambient distance samples. The
//! part of an ambient sample that falls inside a workout is excluded because
//! the workout already accounts for it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::{group_by_week, IsoWeekKey, TimeMask};
use crate::error::{HealthRsError, Result};
use crate::export::csv::SheetData;
use crate::models::{DistanceSample, WalkingWorkout};
use crate::table::Table;

pub const DAILY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Column headers of the daily walking sheet, also used to read it back
pub const DAILY_HEADERS: [&str; 6] = [
    "Date",
    "Total km",
    "Workout km",
    "Non-workout km",
    "Workouts",
    "Workout min",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWalk {
    pub date: NaiveDate,
    pub total_km: f64,
    pub workout_km: f64,
    pub non_workout_km: f64,
    pub workouts: usize,
    pub workout_minutes: f64,
}

impl DailyWalk {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_km: 0.0,
            workout_km: 0.0,
            non_workout_km: 0.0,
            workouts: 0,
            workout_minutes: 0.0,
        }
    }
}

/// Daily walking totals, ascending by date.
///
/// Workouts count on the day they start. Only workouts that carry a distance
/// mask ambient samples; for the others the ambient samples are the only
/// record of the distance walked.
pub fn daily_walking(workouts: &Table<WalkingWorkout>, ambient: &Table<DistanceSample>) -> Vec<DailyWalk> {
    let mask = TimeMask::new(
        workouts
            .rows()
            .iter()
            .filter(|w| w.distance_km.is_some())
            .map(|w| (w.start, w.end)),
    );

    let mut days: BTreeMap<NaiveDate, DailyWalk> = BTreeMap::new();

    for workout in workouts.rows() {
        let date = workout.start.date();
        let day = days.entry(date).or_insert_with(|| DailyWalk::empty(date));
        day.workouts += 1;
        day.workout_km += workout.distance_km.unwrap_or(0.0);
        day.workout_minutes += workout.duration_minutes;
    }

    let mut masked_km = 0.0;
    for sample in ambient.rows() {
        let retained = mask.retained_fraction(sample.start, sample.end);
        let km = sample.kilometers();
        masked_km += km * (1.0 - retained);
        if retained <= 0.0 {
            continue;
        }
        let date = sample.start.date();
        let day = days.entry(date).or_insert_with(|| DailyWalk::empty(date));
        day.non_workout_km += km * retained;
    }
    debug!("Excluded {:.3} km of ambient distance overlapping workouts", masked_km);

    days.into_values()
        .map(|mut day| {
            day.total_km = day.workout_km + day.non_workout_km;
            day
        })
        .collect()
}

/// Reads a daily walking sheet written by this crate back into rows
pub fn daily_from_sheet(sheet: &SheetData) -> Result<Vec<DailyWalk>> {
    let column = |name: &str| {
        sheet.column(name).ok_or_else(|| {
            HealthRsError::Validation(format!("Daily walking sheet has no {:?} column", name))
        })
    };
    let date_col = column(DAILY_HEADERS[0])?;
    let total_col = column(DAILY_HEADERS[1])?;
    let workout_col = column(DAILY_HEADERS[2])?;
    let non_workout_col = column(DAILY_HEADERS[3])?;
    let workouts_col = sheet.column(DAILY_HEADERS[4]);
    let minutes_col = sheet.column(DAILY_HEADERS[5]);

    let mut days = Vec::with_capacity(sheet.rows.len());
    for (index, row) in sheet.rows.iter().enumerate() {
        let line = index + 2;
        let cell = |col: usize| row.get(col).map(|s| s.trim()).unwrap_or("");
        let number = |col: usize| -> Result<f64> {
            let raw = cell(col);
            if raw.is_empty() {
                return Ok(0.0);
            }
            raw.parse::<f64>().map_err(|_| {
                HealthRsError::Validation(format!("Row {}: {:?} is not a number", line, raw))
            })
        };

        let raw_date = cell(date_col);
        if raw_date.is_empty() {
            continue;
        }
        let date = NaiveDate::parse_from_str(raw_date, DAILY_DATE_FORMAT).map_err(|_| {
            HealthRsError::Validation(format!("Row {}: {:?} is not a date", line, raw_date))
        })?;

        days.push(DailyWalk {
            date,
            total_km: number(total_col)?,
            workout_km: number(workout_col)?,
            non_workout_km: number(non_workout_col)?,
            workouts: match workouts_col {
                Some(col) => number(col)? as usize,
                None => 0,
            },
            workout_minutes: match minutes_col {
                Some(col) => number(col)?,
                None => 0.0,
            },
        });
    }

    days.sort_by_key(|d| d.date);
    Ok(days)
}

/// Walking totals of one ISO week, derived from its daily rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyWalk {
    pub week: IsoWeekKey,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub days_with_data: usize,
    pub total_km: f64,
    pub workout_km: f64,
    pub non_workout_km: f64,
}

impl WeeklyWalk {
    pub fn avg_total_km_per_day(&self) -> f64 {
        self.total_km / self.days_with_data as f64
    }

    pub fn avg_non_workout_km_per_day(&self) -> f64 {
        self.non_workout_km / self.days_with_data as f64
    }

    /// Share of non-workout walking; `None` for a week without distance
    pub fn non_workout_share_percent(&self) -> Option<f64> {
        (self.total_km > 0.0).then(|| self.non_workout_km / self.total_km * 100.0)
    }
}

/// Weekly walking totals from daily rows (ascending by date)
pub fn weekly_from_daily(daily: &[DailyWalk]) -> Vec<WeeklyWalk> {
    group_by_week(daily, |d| d.date)
        .into_iter()
        .filter_map(|(week, days)| {
            Some(WeeklyWalk {
                week,
                first_day: days.first()?.date,
                last_day: days.last()?.date,
                days_with_data: days.len(),
                total_km: days.iter().map(|d| d.total_km).sum(),
                workout_km: days.iter().map(|d| d.workout_km).sum(),
                non_workout_km: days.iter().map(|d| d.non_workout_km).sum(),
            })
        })
        .collect()
}

/// Walking workouts of one ISO week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyWorkouts {
    pub week: IsoWeekKey,
    /// First and last day of the week with a workout
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub workouts: usize,
    pub distance_km: f64,
    pub duration_minutes: f64,
}

impl WeeklyWorkouts {
    pub fn hours(&self) -> f64 {
        self.duration_minutes / 60.0
    }

    /// Average pace in minutes per km; `None` without distance
    pub fn pace_min_per_km(&self) -> Option<f64> {
        (self.distance_km > 0.0).then(|| self.duration_minutes / self.distance_km)
    }
}

/// Weekly workout totals from daily rows; days without workouts are ignored
pub fn weekly_workouts(daily: &[DailyWalk]) -> Vec<WeeklyWorkouts> {
    let workout_days: Vec<&DailyWalk> = daily.iter().filter(|d| d.workouts > 0).collect();

    group_by_week(&workout_days, |d| d.date)
        .into_iter()
        .filter_map(|(week, days)| {
            Some(WeeklyWorkouts {
                week,
                first_day: days.first()?.date,
                last_day: days.last()?.date,
                workouts: days.iter().map(|d| d.workouts).sum(),
                distance_km: days.iter().map(|d| d.workout_km).sum(),
                duration_minutes: days.iter().map(|d| d.workout_minutes).sum(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DistanceUnit, WALKING_ACTIVITY};
    use chrono::NaiveDateTime;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn workout(start: &str, end: &str, km: Option<f64>, minutes: f64) -> WalkingWorkout {
        WalkingWorkout {
            start: at(start),
            end: at(end),
            activity_type: WALKING_ACTIVITY.to_string(),
            source_name: Some("Apple Watch".to_string()),
            duration_minutes: minutes,
            distance_km: km,
            active_kcal: None,
            basal_kcal: None,
            elevation_gain_m: None,
        }
    }

    fn sample(start: &str, end: &str, km: f64) -> DistanceSample {
        DistanceSample {
            start: at(start),
            end: at(end),
            distance: km,
            unit: DistanceUnit::Kilometers,
        }
    }

    #[test]
    fn test_overlapping_ambient_sample_is_excluded() {
        let workouts: Table<WalkingWorkout> =
            vec![workout("2024-01-15 10:00:00", "2024-01-15 10:30:00", Some(2.0), 30.0)]
                .into_iter()
                .collect();
        let ambient: Table<DistanceSample> =
            vec![sample("2024-01-15 10:00:00", "2024-01-15 10:15:00", 0.5)]
                .into_iter()
                .collect();

        let days = daily_walking(&workouts, &ambient);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].total_km, 2.0);
        assert_eq!(days[0].non_workout_km, 0.0);
    }

    #[test]
    fn test_partial_overlap_is_proportional() {
        let workouts: Table<WalkingWorkout> =
            vec![workout("2024-01-15 10:00:00", "2024-01-15 10:30:00", Some(2.0), 30.0)]
                .into_iter()
                .collect();
        let ambient: Table<DistanceSample> = vec![
            sample("2024-01-15 10:20:00", "2024-01-15 10:40:00", 1.0),
            sample("2024-01-16 09:00:00", "2024-01-16 09:20:00", 1.2),
        ]
        .into_iter()
        .collect();

        let days = daily_walking(&workouts, &ambient);
        assert_eq!(days.len(), 2);
        assert!((days[0].non_workout_km - 0.5).abs() < 1e-9);
        assert!((days[0].total_km - 2.5).abs() < 1e-9);
        assert_eq!(days[1].workouts, 0);
        assert_eq!(days[1].total_km, 1.2);
    }

    #[test]
    fn test_workout_without_distance_does_not_mask() {
        let workouts: Table<WalkingWorkout> =
            vec![workout("2024-01-15 10:00:00", "2024-01-15 10:30:00", None, 30.0)]
                .into_iter()
                .collect();
        let ambient: Table<DistanceSample> =
            vec![sample("2024-01-15 10:00:00", "2024-01-15 10:15:00", 0.5)]
                .into_iter()
                .collect();

        let days = daily_walking(&workouts, &ambient);
        assert_eq!(days[0].total_km, 0.5);
        assert_eq!(days[0].workouts, 1);
    }

    #[test]
    fn test_weekly_views_from_daily() {
        let day = |date: &str, workout_km: f64, non: f64, workouts: usize, minutes: f64| DailyWalk {
            date: NaiveDate::parse_from_str(date, DAILY_DATE_FORMAT).unwrap(),
            total_km: workout_km + non,
            workout_km,
            non_workout_km: non,
            workouts,
            workout_minutes: minutes,
        };
        let daily = vec![
            day("2024-01-15", 2.0, 0.8, 1, 30.0),
            day("2024-01-16", 0.0, 1.2, 0, 0.0),
            day("2024-01-17", 4.5, 0.0, 1, 60.0),
            day("2024-01-22", 3.0, 1.0, 1, 36.0),
        ];

        let weeks = weekly_from_daily(&daily);
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].days_with_data, 3);
        assert!((weeks[0].total_km - 8.5).abs() < 1e-9);
        assert!((weeks[0].non_workout_km - 2.0).abs() < 1e-9);
        assert!((weeks[0].avg_total_km_per_day() - 8.5 / 3.0).abs() < 1e-9);
        assert!((weeks[0].non_workout_share_percent().unwrap() - 2.0 / 8.5 * 100.0).abs() < 1e-9);

        let workouts = weekly_workouts(&daily);
        assert_eq!(workouts.len(), 2);
        assert_eq!(workouts[0].workouts, 2);
        assert_eq!(workouts[0].first_day, daily[0].date);
        assert_eq!(workouts[0].last_day, daily[2].date);
        assert_eq!(workouts[0].duration_minutes, 90.0);
        assert!((workouts[0].pace_min_per_km().unwrap() - 90.0 / 6.5).abs() < 1e-9);
        assert_eq!(workouts[1].hours(), 0.6);
    }

    #[test]
    fn test_daily_from_sheet() {
        let sheet = SheetData {
            headers: DAILY_HEADERS.iter().map(|h| h.to_string()).collect(),
            rows: vec![
                vec!["2024-01-16", "1.20", "0.00", "1.20", "0", "0"],
                vec!["2024-01-15", "2.80", "2.00", "0.80", "1", "30.00"],
            ]
            .into_iter()
            .map(|r| r.into_iter().map(String::from).collect())
            .collect(),
        };

        let days = daily_from_sheet(&sheet).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(days[0].total_km, 2.8);
        assert_eq!(days[0].workouts, 1);
    }

    #[test]
    fn test_daily_from_sheet_rejects_bad_rows() {
        let sheet = SheetData {
            headers: vec!["Date".to_string(), "Total km".to_string()],
            rows: vec![],
        };
        assert!(matches!(daily_from_sheet(&sheet), Err(HealthRsError::Validation(_))));

        let sheet = SheetData {
            headers: DAILY_HEADERS.iter().map(|h| h.to_string()).collect(),
            rows: vec![vec!["01/15/2024", "1", "1", "0", "1", "10"]
                .into_iter()
                .map(String::from)
                .collect()],
        };
        assert!(daily_from_sheet(&sheet).is_err());
    }
}
