use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::export::ExportFormat;
use crate::logging::LogConfig;
use crate::models::{Reduction, DISTANCE_TYPES, HIKING_ACTIVITY, WALKING_ACTIVITY};
use crate::zones::HeartRateZones;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the export lives and how it is scanned
    pub input: InputSettings,

    /// Where reports are written
    pub output: OutputSettings,

    pub vo2max: Vo2MaxSettings,

    pub walking: WalkingSettings,

    /// Heart rate zone upper bounds for the latest-walk report
    pub zones: HeartRateZones,

    pub logging: LogConfig,
}

/// Input settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// Path of the health export document
    pub export_path: PathBuf,

    /// Ignore entries starting before this date
    pub since: Option<NaiveDate>,

    /// Show a spinner while scanning
    pub show_progress: bool,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            export_path: PathBuf::from("export.xml"),
            since: None,
            show_progress: true,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: PathBuf,

    /// Formats written for every sheet; empty means console only
    pub formats: Vec<ExportFormat>,

    /// Most recent bucket first in every sheet
    pub newest_first: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            formats: vec![ExportFormat::Csv],
            newest_first: true,
        }
    }
}

/// VO2max report settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vo2MaxSettings {
    /// How several readings of one day become the daily value
    pub daily_reduction: Reduction,

    /// Days a weight measurement stays valid for the weight join
    pub lookback_days: u32,
}

impl Default for Vo2MaxSettings {
    fn default() -> Self {
        Self {
            daily_reduction: Reduction::Last,
            lookback_days: 7,
        }
    }
}

/// Walking report settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkingSettings {
    /// Workout activity types counted as walks
    pub activity_types: Vec<String>,

    /// Record types counted as ambient walking distance
    pub distance_types: Vec<String>,

    /// Keep only samples whose source or device contains this text
    pub source_filter: Option<String>,

    /// A trailing stretch shorter than this gets no split of its own
    pub split_tolerance_km: f64,
}

impl Default for WalkingSettings {
    fn default() -> Self {
        Self {
            activity_types: vec![WALKING_ACTIVITY.to_string(), HIKING_ACTIVITY.to_string()],
            distance_types: DISTANCE_TYPES.iter().map(|t| t.to_string()).collect(),
            source_filter: Some("Watch".to_string()),
            split_tolerance_km: 0.05,
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML configuration: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".healthrs")
            .join("config.toml")
    }

    /// Load from an explicit path, or from the default path when it exists.
    ///
    /// An explicit path that cannot be read is an error; a missing default
    /// file silently yields the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let default_path = Self::default_config_path();
                if default_path.is_file() {
                    Self::load_from_file(&default_path)?
                } else {
                    debug!("No config file at {}, using defaults", default_path.display());
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        self.zones
            .validate()
            .with_context(|| "Invalid heart rate zones")?;

        if self.vo2max.lookback_days == 0 {
            anyhow::bail!("vo2max.lookback_days must be at least 1");
        }
        if !(0.0..1.0).contains(&self.walking.split_tolerance_km) {
            anyhow::bail!(
                "walking.split_tolerance_km must be in [0, 1), got {}",
                self.walking.split_tolerance_km
            );
        }
        if self.walking.activity_types.is_empty() {
            anyhow::bail!("walking.activity_types must name at least one workout type");
        }
        if let Some(unknown) = self
            .walking
            .distance_types
            .iter()
            .find(|t| !DISTANCE_TYPES.contains(&t.as_str()))
        {
            anyhow::bail!(
                "walking.distance_types: unsupported record type {}; expected one of {}",
                unknown,
                DISTANCE_TYPES.join(", ")
            );
        }
        if self.walking.distance_types.is_empty() {
            warn!("walking.distance_types is empty; daily walking will only count workouts");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [vo2max]
            daily_reduction = "max"

            [output]
            formats = ["csv", "json"]
            "#,
        )
        .unwrap();

        assert_eq!(config.vo2max.daily_reduction, Reduction::Max);
        assert_eq!(config.vo2max.lookback_days, 7);
        assert_eq!(config.output.formats, vec![ExportFormat::Csv, ExportFormat::Json]);
        assert!(config.output.newest_first);
        assert_eq!(config.input.export_path, PathBuf::from("export.xml"));
        assert_eq!(config.walking.source_filter.as_deref(), Some("Watch"));
        assert_eq!(config.zones, HeartRateZones::default());
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original_config = AppConfig::default();
        original_config.vo2max.lookback_days = 14;
        original_config.input.since = NaiveDate::from_ymd_opt(2024, 1, 1);

        original_config.save_to_file(&config_path).unwrap();
        let loaded_config = AppConfig::load_or_default(Some(&config_path)).unwrap();

        assert_eq!(loaded_config, original_config);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let temp_dir = tempdir().unwrap();
        assert!(AppConfig::load_or_default(Some(&temp_dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.vo2max.lookback_days = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.zones.zone2_max = config.zones.zone1_max;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config
            .walking
            .distance_types
            .push("HKQuantityTypeIdentifierStepCount".to_string());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.vo2max.lookback_days = u32::MAX;
        assert!(config.validate().is_ok());
    }
}
