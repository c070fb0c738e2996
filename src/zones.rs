use serde::{Deserialize, Serialize};

use crate::models::HeartRateSample;

/// Errors that can occur when configuring heart rate zones
#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    #[error("Invalid zone bound: {0}")]
    InvalidBound(String),
    #[error("Zone bounds must increase: {0}")]
    NotIncreasing(String),
}

pub const ZONE_COUNT: usize = 5;

/// Upper bounds (inclusive, bpm) of zones 1 to 4; zone 5 is open ended.
///
/// Defaults:
/// - Z1: up to 114 bpm
/// - Z2: 115-134 bpm
/// - Z3: 135-149 bpm
/// - Z4: 150-169 bpm
/// - Z5: 170+ bpm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartRateZones {
    pub zone1_max: u16,
    pub zone2_max: u16,
    pub zone3_max: u16,
    pub zone4_max: u16,
}

impl Default for HeartRateZones {
    fn default() -> Self {
        Self {
            zone1_max: 114,
            zone2_max: 134,
            zone3_max: 149,
            zone4_max: 169,
        }
    }
}

impl HeartRateZones {
    fn maxima(&self) -> [u16; ZONE_COUNT - 1] {
        [self.zone1_max, self.zone2_max, self.zone3_max, self.zone4_max]
    }

    pub fn validate(&self) -> Result<(), ZoneError> {
        let maxima = self.maxima();
        for (i, &max) in maxima.iter().enumerate() {
            if !(30..=220).contains(&max) {
                return Err(ZoneError::InvalidBound(format!(
                    "zone{}_max must be between 30 and 220 bpm, got {}",
                    i + 1,
                    max
                )));
            }
        }
        for pair in maxima.windows(2) {
            if pair[1] <= pair[0] {
                return Err(ZoneError::NotIncreasing(format!("{} then {}", pair[0], pair[1])));
            }
        }
        Ok(())
    }

    /// Zone number (1-5) for a heart rate; fractional rates above a bound go up
    pub fn zone_for(&self, bpm: f64) -> u8 {
        if bpm <= self.zone1_max as f64 {
            1
        } else if bpm <= self.zone2_max as f64 {
            2
        } else if bpm <= self.zone3_max as f64 {
            3
        } else if bpm <= self.zone4_max as f64 {
            4
        } else {
            5
        }
    }

    /// Human readable range, e.g. `"115-134 BPM"`
    pub fn range_label(&self, zone: u8) -> String {
        let maxima = self.maxima();
        match zone {
            1 => format!("<={} BPM", self.zone1_max),
            2..=4 => {
                let i = zone as usize - 1;
                format!("{}-{} BPM", maxima[i - 1] + 1, maxima[i])
            }
            _ => format!("{}+ BPM", self.zone4_max + 1),
        }
    }
}

/// Seconds spent in each zone during a workout
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ZoneDistribution {
    pub seconds: [f64; ZONE_COUNT],
}

impl ZoneDistribution {
    pub fn total_seconds(&self) -> f64 {
        self.seconds.iter().sum()
    }

    pub fn percent(&self, zone: u8) -> f64 {
        let total = self.total_seconds();
        if total <= 0.0 || zone == 0 || zone as usize > ZONE_COUNT {
            0.0
        } else {
            self.seconds[zone as usize - 1] / total * 100.0
        }
    }
}

/// Zone distribution analysis utilities
pub struct ZoneAnalyzer;

impl ZoneAnalyzer {
    /// Time in zones from heart rate samples sorted by time.
    ///
    /// The interval between sample `i` and sample `i + 1` is credited to the
    /// zone of sample `i`; the last sample contributes nothing.
    pub fn time_in_zones(samples: &[HeartRateSample], zones: &HeartRateZones) -> ZoneDistribution {
        let mut distribution = ZoneDistribution::default();
        for pair in samples.windows(2) {
            let seconds = (pair[1].timestamp - pair[0].timestamp).num_milliseconds() as f64 / 1000.0;
            if seconds <= 0.0 {
                continue;
            }
            let zone = zones.zone_for(pair[0].bpm);
            distribution.seconds[zone as usize - 1] += seconds;
        }
        distribution
    }
}
