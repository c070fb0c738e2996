// Library interface for healthrs
// The binary and the integration tests drive reports through this crate

pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod last_walk;
pub mod logging;
pub mod models;
pub mod reports;
pub mod table;
pub mod vo2max;
pub mod walking;
pub mod zones;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use error::{HealthRsError, Result};
pub use export::{ExportFormat, ReportTable};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::{Metric, Reduction};
pub use reports::{ReportKind, ReportOutput, ReportRunner, RunSummary};
pub use table::{Table, TableBuilder};
pub use zones::HeartRateZones;
