//! Detailed summary of the most recent walking workout: splits per kilometer,
//! heart rate and time in heart rate zones.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use statrs::statistics::Statistics;
use tracing::debug;

use crate::error::{HealthRsError, Result};
use crate::models::{DistanceSample, HeartRateSample, WalkingWorkout};
use crate::table::Table;
use crate::zones::{HeartRateZones, ZoneAnalyzer, ZoneDistribution};

/// How the distance samples recorded during a workout should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DistanceMode {
    /// Each sample is the distance covered during its own interval
    Delta,
    /// Each sample is the distance since the workout started
    Cumulative,
}

/// Most recent workout by start time
pub fn latest_workout(workouts: &Table<WalkingWorkout>) -> Result<&WalkingWorkout> {
    workouts.last().ok_or_else(|| HealthRsError::NotFound {
        what: "walking or hiking workout".to_string(),
    })
}

/// Turns the samples of a workout into `(time, km since start)` points.
///
/// Samples are ordered by end time. The mode is whichever reading lands
/// closer to the workout's own total: the sum of all samples (deltas) or the
/// largest sample (cumulative). Without a workout total they are read as deltas.
pub fn cumulative_distance(
    samples: &[DistanceSample],
    workout_total_km: Option<f64>,
) -> (DistanceMode, Vec<(NaiveDateTime, f64)>) {
    let mut points: Vec<(NaiveDateTime, f64)> =
        samples.iter().map(|s| (s.end, s.kilometers())).collect();
    points.sort_by(|a, b| a.0.cmp(&b.0));

    let mode = match workout_total_km {
        Some(total) if !points.is_empty() => {
            let sum: f64 = points.iter().map(|p| p.1).sum();
            let max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
            if (sum - total).abs() <= (max - total).abs() {
                DistanceMode::Delta
            } else {
                DistanceMode::Cumulative
            }
        }
        _ => DistanceMode::Delta,
    };

    if mode == DistanceMode::Delta {
        let mut running = 0.0;
        for point in points.iter_mut() {
            running += point.1;
            point.1 = running;
        }
    }

    (mode, points)
}

/// One kilometer (or the trailing partial stretch) of a workout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Split {
    /// 1-based split number
    pub index: usize,
    pub length_km: f64,
    pub end_time: NaiveDateTime,
    pub duration_seconds: f64,
    pub avg_hr: Option<f64>,
}

impl Split {
    /// Seconds per kilometer over this split's own length
    pub fn pace_sec_per_km(&self) -> f64 {
        self.duration_seconds / self.length_km
    }
}

/// Split boundaries in km, ascending and produced on demand
fn split_bounds(total_km: f64, tolerance_km: f64) -> impl Iterator<Item = f64> {
    let full = if total_km > 0.0 {
        (total_km + tolerance_km).floor()
    } else {
        0.0
    };
    let trailing = (total_km > 0.0 && total_km - full > tolerance_km).then_some(total_km);
    (1u64..)
        .map(|k| k as f64)
        .take_while(move |k| *k <= full)
        .chain(trailing)
}

/// Per-kilometer splits from cumulative distance points.
///
/// The time a boundary is crossed is interpolated linearly between the two
/// surrounding points, starting from `(start, 0 km)`. A trailing stretch
/// shorter than `tolerance_km` gets no split of its own, and a boundary the
/// samples fall short of by at most `tolerance_km` ends at the last sample.
/// Splitting stops at the first boundary the samples do not reach. Average heart rate covers samples inside the split, ends
/// included.
pub fn compute_splits(
    cumulative: &[(NaiveDateTime, f64)],
    heart_rate: &[HeartRateSample],
    start: NaiveDateTime,
    total_km: f64,
    tolerance_km: f64,
) -> Vec<Split> {
    let Some(&(last_time, last_km)) = cumulative.last() else {
        return Vec::new();
    };

    let mut points = Vec::with_capacity(cumulative.len() + 1);
    points.push((start, 0.0));
    points.extend_from_slice(cumulative);

    let mut splits: Vec<Split> = Vec::new();
    let mut previous_bound = 0.0;
    let mut previous_time = start;
    let mut idx = 1;

    for (i, target) in split_bounds(total_km, tolerance_km).enumerate() {
        while idx < points.len() && points[idx].1 < target {
            idx += 1;
        }

        let crossing = if idx < points.len() {
            let (t0, d0) = points[idx - 1];
            let (t1, d1) = points[idx];
            if d1 == d0 {
                t1
            } else {
                let frac = (target - d0) / (d1 - d0);
                let ms = ((t1 - t0).num_milliseconds() as f64 * frac).round() as i64;
                t0 + Duration::milliseconds(ms)
            }
        } else if target - last_km <= tolerance_km {
            last_time
        } else {
            debug!("Distance samples end at {:.2} km, short of split {}", last_km, i + 1);
            break;
        };

        let avg_hr = {
            let window: Vec<f64> = heart_rate
                .iter()
                .filter(|s| s.timestamp >= previous_time && s.timestamp <= crossing)
                .map(|s| s.bpm)
                .collect();
            (!window.is_empty()).then(|| window.iter().mean())
        };

        splits.push(Split {
            index: i + 1,
            length_km: target - previous_bound,
            end_time: crossing,
            duration_seconds: (crossing - previous_time).num_milliseconds() as f64 / 1000.0,
            avg_hr,
        });

        previous_bound = target;
        previous_time = crossing;
    }

    splits
}

/// Everything shown for the most recent walk
#[derive(Debug, Clone, Serialize)]
pub struct LastWalkReport {
    pub workout: WalkingWorkout,
    pub distance_mode: DistanceMode,
    pub splits: Vec<Split>,
    pub avg_hr: Option<f64>,
    pub zones: HeartRateZones,
    pub time_in_zones: ZoneDistribution,
    pub heart_rate_samples: usize,
    pub distance_samples: usize,
}

impl LastWalkReport {
    /// Wall-clock time from start to end, pauses included
    pub fn elapsed(&self) -> Duration {
        self.workout.elapsed()
    }

    /// Recorded workout time
    pub fn moving_time(&self) -> Duration {
        Duration::milliseconds((self.workout.duration_minutes * 60_000.0).round() as i64)
    }

    pub fn avg_pace_sec_per_km(&self) -> Option<f64> {
        let km = self.workout.distance_km.filter(|km| *km > 0.0)?;
        let seconds = self.workout.duration_minutes * 60.0;
        (seconds > 0.0).then(|| seconds / km)
    }
}

/// Builds the summary from the samples recorded while the workout ran.
///
/// Heart rate samples count when their timestamp lies within the workout.
/// Distance samples count when their interval overlaps the workout's interior.
pub fn build_last_walk_report(
    workout: &WalkingWorkout,
    heart_rate: &Table<HeartRateSample>,
    distances: &Table<DistanceSample>,
    zones: &HeartRateZones,
    tolerance_km: f64,
) -> LastWalkReport {
    let hr: Vec<HeartRateSample> = heart_rate
        .rows()
        .iter()
        .filter(|s| s.timestamp >= workout.start && s.timestamp <= workout.end)
        .cloned()
        .collect();

    let samples: Vec<DistanceSample> = distances
        .rows()
        .iter()
        .filter(|s| s.end > workout.start && s.start < workout.end)
        .cloned()
        .collect();

    let (distance_mode, cumulative) = cumulative_distance(&samples, workout.distance_km);
    let total_km = workout
        .distance_km
        .or_else(|| cumulative.last().map(|p| p.1))
        .unwrap_or(0.0);

    let splits = compute_splits(&cumulative, &hr, workout.start, total_km, tolerance_km);
    let avg_hr = (!hr.is_empty()).then(|| hr.iter().map(|s| s.bpm).mean());

    debug!(
        "Last walk at {}: {} heart rate samples, {} distance samples ({:?}), {} splits",
        workout.start,
        hr.len(),
        samples.len(),
        distance_mode,
        splits.len()
    );

    LastWalkReport {
        workout: workout.clone(),
        distance_mode,
        time_in_zones: ZoneAnalyzer::time_in_zones(&hr, zones),
        zones: *zones,
        splits,
        avg_hr,
        heart_rate_samples: hr.len(),
        distance_samples: samples.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DistanceUnit, HIKING_ACTIVITY};

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn sample(start: &str, end: &str, km: f64) -> DistanceSample {
        DistanceSample {
            start: at(start),
            end: at(end),
            distance: km,
            unit: DistanceUnit::Kilometers,
        }
    }

    fn hr(time: &str, bpm: f64) -> HeartRateSample {
        HeartRateSample {
            timestamp: at(time),
            bpm,
        }
    }

    fn hike() -> WalkingWorkout {
        WalkingWorkout {
            start: at("2024-01-17 07:00:00"),
            end: at("2024-01-17 08:00:00"),
            activity_type: HIKING_ACTIVITY.to_string(),
            source_name: Some("Apple Watch".to_string()),
            duration_minutes: 60.0,
            distance_km: Some(4.5),
            active_kcal: Some(300.0),
            basal_kcal: Some(80.0),
            elevation_gain_m: Some(120.0),
        }
    }

    fn hike_samples() -> Vec<DistanceSample> {
        vec![
            sample("2024-01-17 07:00:00", "2024-01-17 07:20:00", 1.5),
            sample("2024-01-17 07:20:00", "2024-01-17 07:40:00", 1.5),
            sample("2024-01-17 07:40:00", "2024-01-17 08:00:00", 1.5),
        ]
    }

    fn hike_heart_rate() -> Vec<HeartRateSample> {
        vec![
            hr("2024-01-17 07:00:00", 100.0),
            hr("2024-01-17 07:20:00", 120.0),
            hr("2024-01-17 07:40:00", 140.0),
            hr("2024-01-17 07:59:00", 155.0),
        ]
    }

    #[test]
    fn test_latest_workout_not_found() {
        let empty: Table<WalkingWorkout> = Vec::new().into_iter().collect();
        let err = latest_workout(&empty).unwrap_err();
        assert!(matches!(err, HealthRsError::NotFound { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_delta_and_cumulative_detection() {
        let (mode, points) = cumulative_distance(&hike_samples(), Some(4.5));
        assert_eq!(mode, DistanceMode::Delta);
        assert_eq!(points.last().unwrap().1, 4.5);

        let cumulative = vec![
            sample("2024-01-17 07:00:00", "2024-01-17 07:20:00", 1.5),
            sample("2024-01-17 07:00:00", "2024-01-17 07:40:00", 3.0),
            sample("2024-01-17 07:00:00", "2024-01-17 08:00:00", 4.5),
        ];
        let (mode, points) = cumulative_distance(&cumulative, Some(4.5));
        assert_eq!(mode, DistanceMode::Cumulative);
        assert_eq!(points[1].1, 3.0);
    }

    #[test]
    fn test_split_bounds_tolerance() {
        let bounds = |total| split_bounds(total, 0.05).collect::<Vec<_>>();
        assert_eq!(bounds(4.5), vec![1.0, 2.0, 3.0, 4.0, 4.5]);
        assert_eq!(bounds(3.03), vec![1.0, 2.0, 3.0]);
        assert_eq!(bounds(2.97), vec![1.0, 2.0, 3.0]);
        assert!(bounds(0.0).is_empty());
        assert!(bounds(f64::NAN).is_empty());
    }

    #[test]
    fn test_splits_interpolated() {
        let (_, points) = cumulative_distance(&hike_samples(), Some(4.5));
        let splits = compute_splits(&points, &hike_heart_rate(), at("2024-01-17 07:00:00"), 4.5, 0.05);

        assert_eq!(splits.len(), 5);
        let ends: Vec<NaiveDateTime> = splits.iter().map(|s| s.end_time).collect();
        assert_eq!(
            ends,
            vec![
                at("2024-01-17 07:13:20"),
                at("2024-01-17 07:26:40"),
                at("2024-01-17 07:40:00"),
                at("2024-01-17 07:53:20"),
                at("2024-01-17 08:00:00"),
            ]
        );
        for split in &splits {
            assert!((split.pace_sec_per_km() - 800.0).abs() < 1e-6);
        }
        assert_eq!(splits[4].length_km, 0.5);

        let hrs: Vec<Option<f64>> = splits.iter().map(|s| s.avg_hr).collect();
        assert_eq!(
            hrs,
            vec![Some(100.0), Some(120.0), Some(140.0), Some(140.0), Some(155.0)]
        );
    }

    #[test]
    fn test_short_samples_end_within_tolerance() {
        let samples = vec![sample("2024-01-17 07:00:00", "2024-01-17 07:12:00", 0.97)];
        let (_, points) = cumulative_distance(&samples, Some(0.97));
        let splits = compute_splits(&points, &[], at("2024-01-17 07:00:00"), 0.97, 0.05);
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].end_time, at("2024-01-17 07:12:00"));
        assert_eq!(splits[0].avg_hr, None);
    }

    #[test]
    fn test_last_walk_report() {
        let workout = hike();
        let mut hr_rows = hike_heart_rate();
        hr_rows.push(hr("2024-01-17 09:00:00", 90.0));
        let heart_rate: Table<HeartRateSample> = hr_rows.into_iter().collect();

        let mut distance_rows = hike_samples();
        distance_rows.push(sample("2024-01-17 06:40:00", "2024-01-17 07:00:00", 1.0));
        let distances: Table<DistanceSample> = distance_rows.into_iter().collect();

        let report =
            build_last_walk_report(&workout, &heart_rate, &distances, &HeartRateZones::default(), 0.05);

        assert_eq!(report.heart_rate_samples, 4);
        assert_eq!(report.distance_samples, 3);
        assert_eq!(report.avg_hr, Some(128.75));
        assert_eq!(report.splits.len(), 5);
        assert_eq!(report.time_in_zones.seconds, [1200.0, 1200.0, 1140.0, 0.0, 0.0]);
        assert_eq!(report.elapsed(), Duration::minutes(60));
        assert_eq!(report.moving_time(), Duration::minutes(60));
        assert!((report.avg_pace_sec_per_km().unwrap() - 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_huge_workout_total_stops_at_last_sample() {
        let mut workout = hike();
        workout.distance_km = Some(1e300);
        let distances: Table<DistanceSample> =
            vec![sample("2024-01-17 07:00:00", "2024-01-17 07:12:00", 1.0)]
                .into_iter()
                .collect();

        let report = build_last_walk_report(
            &workout,
            &Vec::<HeartRateSample>::new().into_iter().collect(),
            &distances,
            &HeartRateZones::default(),
            0.05,
        );

        assert_eq!(report.splits.len(), 1);
        assert_eq!(report.splits[0].end_time, at("2024-01-17 07:12:00"));
    }
}
