use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CoercionError;

pub const VO2_MAX_TYPE: &str = "HKQuantityTypeIdentifierVO2Max";
pub const BODY_MASS_TYPE: &str = "HKQuantityTypeIdentifierBodyMass";
pub const HEART_RATE_TYPE: &str = "HKQuantityTypeIdentifierHeartRate";
pub const DISTANCE_WALKING_RUNNING_TYPE: &str = "HKQuantityTypeIdentifierDistanceWalkingRunning";
pub const DISTANCE_WALKING_TYPE: &str = "HKQuantityTypeIdentifierDistanceWalking";
pub const DISTANCE_HIKING_TYPE: &str = "HKQuantityTypeIdentifierDistanceHiking";
pub const ACTIVE_ENERGY_TYPE: &str = "HKQuantityTypeIdentifierActiveEnergyBurned";
pub const BASAL_ENERGY_TYPE: &str = "HKQuantityTypeIdentifierBasalEnergyBurned";

pub const WALKING_ACTIVITY: &str = "HKWorkoutActivityTypeWalking";
pub const HIKING_ACTIVITY: &str = "HKWorkoutActivityTypeHiking";

pub const ELEVATION_ASCENDED_KEY: &str = "HKElevationAscended";

/// Record types that carry walking distance
pub const DISTANCE_TYPES: [&str; 3] = [
    DISTANCE_WALKING_RUNNING_TYPE,
    DISTANCE_WALKING_TYPE,
    DISTANCE_HIKING_TYPE,
];

/// A `<Record>` element with its attributes kept verbatim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub record_type: String,
    pub source_name: Option<String>,
    pub device: Option<String>,
    pub unit: Option<String>,
    pub value: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// A `<WorkoutStatistics>` child of a workout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStatistic {
    pub statistic_type: String,
    pub sum: Option<String>,
    pub unit: Option<String>,
}

/// A `<Workout>` element with the children the reports use
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWorkout {
    pub activity_type: String,
    pub source_name: Option<String>,
    pub device: Option<String>,
    pub duration: Option<String>,
    pub duration_unit: Option<String>,
    pub total_distance: Option<String>,
    pub total_distance_unit: Option<String>,
    pub total_energy_burned: Option<String>,
    pub total_energy_burned_unit: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub statistics: Vec<RawStatistic>,
    pub metadata: Vec<(String, String)>,
}

impl RawWorkout {
    /// First statistic whose type is one of `types`
    pub fn statistic(&self, types: &[&str]) -> Option<&RawStatistic> {
        self.statistics
            .iter()
            .find(|s| types.contains(&s.statistic_type.as_str()))
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// One element streamed out of the export, before any filtering
#[derive(Debug, Clone, PartialEq)]
pub enum RawEntry {
    Record(RawRecord),
    Workout(RawWorkout),
}

impl RawEntry {
    pub fn source_name(&self) -> Option<&str> {
        match self {
            RawEntry::Record(r) => r.source_name.as_deref(),
            RawEntry::Workout(w) => w.source_name.as_deref(),
        }
    }

    pub fn device(&self) -> Option<&str> {
        match self {
            RawEntry::Record(r) => r.device.as_deref(),
            RawEntry::Workout(w) => w.device.as_deref(),
        }
    }

    pub fn start_date(&self) -> Option<&str> {
        match self {
            RawEntry::Record(r) => r.start_date.as_deref(),
            RawEntry::Workout(w) => w.start_date.as_deref(),
        }
    }

    pub fn end_date(&self) -> Option<&str> {
        match self {
            RawEntry::Record(r) => r.end_date.as_deref(),
            RawEntry::Workout(w) => w.end_date.as_deref(),
        }
    }
}

/// A selected entry whose timestamps have been parsed
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub raw: RawEntry,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Entry {
    pub fn record(&self) -> Option<&RawRecord> {
        match &self.raw {
            RawEntry::Record(r) => Some(r),
            RawEntry::Workout(_) => None,
        }
    }

    pub fn workout(&self) -> Option<&RawWorkout> {
        match &self.raw {
            RawEntry::Workout(w) => Some(w),
            RawEntry::Record(_) => None,
        }
    }

    /// Record type or workout activity type
    pub fn type_tag(&self) -> &str {
        match &self.raw {
            RawEntry::Record(r) => &r.record_type,
            RawEntry::Workout(w) => &w.activity_type,
        }
    }
}

/// How the values that fall into one time bucket collapse into one value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    Sum,
    Mean,
    Last,
    Max,
}

impl Reduction {
    /// Reduce values given in chronological order; `None` for an empty bucket
    pub fn reduce(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let reduced = match self {
            Reduction::Sum => values.iter().sum(),
            Reduction::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Reduction::Last => values[values.len() - 1],
            Reduction::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        };
        Some(reduced)
    }
}

impl std::str::FromStr for Reduction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sum" => Ok(Reduction::Sum),
            "mean" | "avg" | "average" => Ok(Reduction::Mean),
            "last" | "latest" => Ok(Reduction::Last),
            "max" | "maximum" => Ok(Reduction::Max),
            _ => Err(format!("Invalid reduction: {}", s)),
        }
    }
}

impl std::fmt::Display for Reduction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reduction::Sum => write!(f, "sum"),
            Reduction::Mean => write!(f, "mean"),
            Reduction::Last => write!(f, "last"),
            Reduction::Max => write!(f, "max"),
        }
    }
}

/// Distance units seen in exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    Meters,
    Kilometers,
    Miles,
    Yards,
    Feet,
}

impl DistanceUnit {
    pub fn parse(unit: &str) -> Option<Self> {
        match unit.trim() {
            "m" | "meter" | "meters" => Some(DistanceUnit::Meters),
            "km" | "kilometer" | "kilometers" => Some(DistanceUnit::Kilometers),
            "mi" | "mile" | "miles" => Some(DistanceUnit::Miles),
            "yd" | "yard" | "yards" => Some(DistanceUnit::Yards),
            "ft" | "foot" | "feet" => Some(DistanceUnit::Feet),
            _ => None,
        }
    }

    pub fn to_km(&self, value: f64) -> f64 {
        match self {
            DistanceUnit::Meters => value / 1000.0,
            DistanceUnit::Kilometers => value,
            DistanceUnit::Miles => value * 1.609_344,
            DistanceUnit::Yards => value * 0.000_914_4,
            DistanceUnit::Feet => value * 0.000_304_8,
        }
    }
}

/// Body mass units seen in exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MassUnit {
    Kilograms,
    Grams,
    Pounds,
    Stones,
}

impl MassUnit {
    pub fn parse(unit: &str) -> Option<Self> {
        match unit.trim() {
            "kg" => Some(MassUnit::Kilograms),
            "g" => Some(MassUnit::Grams),
            "lb" | "lbs" => Some(MassUnit::Pounds),
            "st" => Some(MassUnit::Stones),
            _ => None,
        }
    }

    pub fn to_kg(&self, value: f64) -> f64 {
        match self {
            MassUnit::Kilograms => value,
            MassUnit::Grams => value / 1000.0,
            MassUnit::Pounds => value * 0.453_592_37,
            MassUnit::Stones => value * 6.350_293_18,
        }
    }
}

/// Converts a workout `duration` to minutes; `min` is assumed when no unit is given
fn duration_to_minutes(value: f64, unit: Option<&str>) -> Option<f64> {
    match unit.map(str::trim) {
        None | Some("min") | Some("minute") | Some("minutes") => Some(value),
        Some("s") | Some("sec") | Some("second") | Some("seconds") => Some(value / 60.0),
        Some("hr") | Some("h") | Some("hour") | Some("hours") => Some(value * 60.0),
        Some(_) => None,
    }
}

/// Converts energy to kilocalories
fn energy_to_kcal(value: f64, unit: Option<&str>) -> Option<f64> {
    match unit.map(str::trim) {
        None | Some("kcal") | Some("Cal") => Some(value),
        Some("kJ") => Some(value / 4.184),
        Some("cal") => Some(value / 1000.0),
        Some(_) => None,
    }
}

fn parse_number(field: &str, value: Option<&str>) -> Result<f64, CoercionError> {
    let value = value.ok_or_else(|| CoercionError::MissingValue {
        field: field.to_string(),
    })?;
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| CoercionError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        })?;
    if !parsed.is_finite() {
        return Err(CoercionError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(parsed)
}

fn expect_record<'a>(entry: &'a Entry, metric: &str) -> Result<&'a RawRecord, CoercionError> {
    entry.record().ok_or_else(|| CoercionError::WrongEntry {
        expected: format!("{} record", metric),
    })
}

/// A typed row the Table Builder can produce from a selected entry.
///
/// The declared `REDUCTION` is what daily buckets of this metric use unless a
/// report configures otherwise.
pub trait Metric: Clone {
    const NAME: &'static str;
    const REDUCTION: Reduction;

    /// Whether this metric is built from the given entry at all
    fn accepts(entry: &Entry) -> bool;

    fn from_entry(entry: &Entry) -> Result<Self, CoercionError>;

    /// Deduplication and ordering key
    fn timestamp(&self) -> NaiveDateTime;

    /// Value in the metric's canonical unit
    fn value(&self) -> f64;

    fn date(&self) -> NaiveDate {
        self.timestamp().date()
    }
}

/// VO2max sample in mL/(kg·min), the unit the export already uses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vo2MaxReading {
    pub timestamp: NaiveDateTime,
    pub ml_per_kg_min: f64,
    pub unit: Option<String>,
}

impl Metric for Vo2MaxReading {
    const NAME: &'static str = "VO2max";
    const REDUCTION: Reduction = Reduction::Last;

    fn accepts(entry: &Entry) -> bool {
        entry.record().is_some_and(|r| r.record_type == VO2_MAX_TYPE)
    }

    fn from_entry(entry: &Entry) -> Result<Self, CoercionError> {
        let record = expect_record(entry, Self::NAME)?;
        Ok(Vo2MaxReading {
            timestamp: entry.start,
            ml_per_kg_min: parse_number("value", record.value.as_deref())?,
            unit: record.unit.clone(),
        })
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn value(&self) -> f64 {
        self.ml_per_kg_min
    }
}

/// Body mass sample; the unit stays as declared until `value()` converts it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyMassReading {
    pub timestamp: NaiveDateTime,
    pub mass: f64,
    pub unit: MassUnit,
}

impl BodyMassReading {
    pub fn kilograms(&self) -> f64 {
        self.unit.to_kg(self.mass)
    }
}

impl Metric for BodyMassReading {
    const NAME: &'static str = "body mass";
    const REDUCTION: Reduction = Reduction::Mean;

    fn accepts(entry: &Entry) -> bool {
        entry.record().is_some_and(|r| r.record_type == BODY_MASS_TYPE)
    }

    fn from_entry(entry: &Entry) -> Result<Self, CoercionError> {
        let record = expect_record(entry, Self::NAME)?;
        let mass = parse_number("value", record.value.as_deref())?;
        let unit_str = record.unit.as_deref().unwrap_or("kg");
        let unit = MassUnit::parse(unit_str).ok_or_else(|| CoercionError::UnknownUnit {
            metric: Self::NAME.to_string(),
            unit: unit_str.to_string(),
        })?;
        Ok(BodyMassReading {
            timestamp: entry.start,
            mass,
            unit,
        })
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn value(&self) -> f64 {
        self.kilograms()
    }
}

/// Walking distance sample covering `[start, end]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceSample {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub distance: f64,
    pub unit: DistanceUnit,
}

impl DistanceSample {
    pub fn kilometers(&self) -> f64 {
        self.unit.to_km(self.distance)
    }
}

impl Metric for DistanceSample {
    const NAME: &'static str = "walking distance";
    const REDUCTION: Reduction = Reduction::Sum;

    fn accepts(entry: &Entry) -> bool {
        entry
            .record()
            .is_some_and(|r| DISTANCE_TYPES.contains(&r.record_type.as_str()))
    }

    fn from_entry(entry: &Entry) -> Result<Self, CoercionError> {
        let record = expect_record(entry, Self::NAME)?;
        let distance = parse_number("value", record.value.as_deref())?;
        let unit_str = record.unit.as_deref().unwrap_or("km");
        let unit = DistanceUnit::parse(unit_str).ok_or_else(|| CoercionError::UnknownUnit {
            metric: Self::NAME.to_string(),
            unit: unit_str.to_string(),
        })?;
        Ok(DistanceSample {
            start: entry.start,
            end: entry.end,
            distance,
            unit,
        })
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.start
    }

    fn value(&self) -> f64 {
        self.kilometers()
    }
}

/// Heart rate sample in beats per minute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    pub timestamp: NaiveDateTime,
    pub bpm: f64,
}

impl Metric for HeartRateSample {
    const NAME: &'static str = "heart rate";
    const REDUCTION: Reduction = Reduction::Mean;

    fn accepts(entry: &Entry) -> bool {
        entry.record().is_some_and(|r| r.record_type == HEART_RATE_TYPE)
    }

    fn from_entry(entry: &Entry) -> Result<Self, CoercionError> {
        let record = expect_record(entry, Self::NAME)?;
        Ok(HeartRateSample {
            timestamp: entry.start,
            bpm: parse_number("value", record.value.as_deref())?,
        })
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn value(&self) -> f64 {
        self.bpm
    }
}

/// A walking or hiking workout with its summary statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkingWorkout {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub activity_type: String,
    pub source_name: Option<String>,
    pub duration_minutes: f64,
    pub distance_km: Option<f64>,
    pub active_kcal: Option<f64>,
    pub basal_kcal: Option<f64>,
    pub elevation_gain_m: Option<f64>,
}

impl WalkingWorkout {
    /// Wall-clock time between start and end
    pub fn elapsed(&self) -> chrono::Duration {
        self.end - self.start
    }

    pub fn total_kcal(&self) -> Option<f64> {
        match (self.active_kcal, self.basal_kcal) {
            (None, None) => None,
            (active, basal) => Some(active.unwrap_or(0.0) + basal.unwrap_or(0.0)),
        }
    }

    fn distance_to_km(field: &str, raw: &str, unit: Option<&str>) -> Result<f64, CoercionError> {
        let value = parse_number(field, Some(raw))?;
        let unit_str = unit.unwrap_or("km");
        let unit = DistanceUnit::parse(unit_str).ok_or_else(|| CoercionError::UnknownUnit {
            metric: "workout distance".to_string(),
            unit: unit_str.to_string(),
        })?;
        Ok(unit.to_km(value))
    }

    /// `totalDistance`, else the first usable distance statistic.
    ///
    /// A workout whose distance cannot be read at all is kept without one.
    fn distance_from(workout: &RawWorkout) -> Option<f64> {
        if let Some(total) = workout.total_distance.as_deref() {
            match Self::distance_to_km("totalDistance", total, workout.total_distance_unit.as_deref()) {
                Ok(km) => return Some(km),
                Err(e) => warn!(
                    "Workout at {}: {}; trying its statistics",
                    workout.start_date.as_deref().unwrap_or("?"),
                    e
                ),
            }
        }

        workout
            .statistics
            .iter()
            .filter(|stat| DISTANCE_TYPES.contains(&stat.statistic_type.as_str()))
            .find_map(|stat| {
                let raw = stat.sum.as_deref()?;
                Self::distance_to_km("sum", raw, stat.unit.as_deref())
                    .map_err(|e| warn!("Workout distance statistic skipped: {}", e))
                    .ok()
            })
    }

    fn energy_from(workout: &RawWorkout, statistic_type: &str) -> Option<f64> {
        let stat = workout.statistic(&[statistic_type])?;
        let value = parse_number("sum", stat.sum.as_deref()).ok()?;
        energy_to_kcal(value, stat.unit.as_deref())
    }

    /// `HKElevationAscended` is written as `"1234 cm"` or `"12.3 m"`
    fn elevation_from(workout: &RawWorkout) -> Option<f64> {
        let raw = workout.metadata_value(ELEVATION_ASCENDED_KEY)?;
        let mut parts = raw.split_whitespace();
        let value: f64 = parts.next()?.parse().ok()?;
        match parts.next() {
            Some("cm") => Some(value / 100.0),
            Some("m") | None => Some(value),
            Some("ft") => Some(value * 0.3048),
            Some(_) => None,
        }
    }
}

impl Metric for WalkingWorkout {
    const NAME: &'static str = "walking workout";
    const REDUCTION: Reduction = Reduction::Sum;

    fn accepts(entry: &Entry) -> bool {
        entry.workout().is_some()
    }

    fn from_entry(entry: &Entry) -> Result<Self, CoercionError> {
        let workout = entry.workout().ok_or_else(|| CoercionError::WrongEntry {
            expected: "workout".to_string(),
        })?;

        let duration_minutes = match workout.duration.as_deref() {
            Some(raw) => {
                let value = parse_number("duration", Some(raw))?;
                duration_to_minutes(value, workout.duration_unit.as_deref()).ok_or_else(|| {
                    CoercionError::UnknownUnit {
                        metric: "workout duration".to_string(),
                        unit: workout.duration_unit.clone().unwrap_or_default(),
                    }
                })?
            }
            None => (entry.end - entry.start).num_seconds() as f64 / 60.0,
        };

        let active_kcal = Self::energy_from(workout, ACTIVE_ENERGY_TYPE).or_else(|| {
            let total = parse_number("totalEnergyBurned", workout.total_energy_burned.as_deref()).ok()?;
            energy_to_kcal(total, workout.total_energy_burned_unit.as_deref())
        });

        Ok(WalkingWorkout {
            start: entry.start,
            end: entry.end,
            activity_type: workout.activity_type.clone(),
            source_name: workout.source_name.clone(),
            duration_minutes,
            distance_km: Self::distance_from(workout),
            active_kcal,
            basal_kcal: Self::energy_from(workout, BASAL_ENERGY_TYPE),
            elevation_gain_m: Self::elevation_from(workout),
        })
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.start
    }

    fn value(&self) -> f64 {
        self.distance_km.unwrap_or(0.0)
    }
}
