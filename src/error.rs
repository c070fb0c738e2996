//! Unified error hierarchy for healthrs
//!
//! Separates fatal conditions (missing export, malformed XML, failed writes)
//! from the per-row conditions that are counted and skipped.

use std::path::PathBuf;
use thiserror::Error;

use crate::export::ExportError;

/// Top-level error type for all healthrs operations
#[derive(Debug, Error)]
pub enum HealthRsError {
    /// The export file does not exist at the configured path
    #[error("Export file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Streaming the export failed
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// The export holds no rows for a report that needs at least one
    #[error("No data for {report}: {reason}")]
    NoData { report: String, reason: String },

    /// A report looked for one specific item and found none
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Writing or reading a report sheet failed
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while streaming the export document
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The XML itself is malformed
    #[error("Malformed XML near byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },

    /// The document ended inside an element
    #[error("Unexpected end of file inside <{element}>")]
    UnexpectedEof { element: String },

    /// A timestamp attribute did not match the export format
    #[error("Invalid timestamp: {value:?}")]
    InvalidTimestamp { value: String },
}

/// Reasons a matched element could not become a typed row
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    /// A required attribute is absent
    #[error("Missing attribute: {field}")]
    MissingValue { field: String },

    /// A numeric attribute did not parse
    #[error("Invalid number in {field}: {value:?}")]
    InvalidNumber { field: String, value: String },

    /// The declared unit is not one this metric understands
    #[error("Unknown unit {unit:?} for {metric}")]
    UnknownUnit { metric: String, unit: String },

    /// The entry is a record where a workout was expected, or vice versa
    #[error("Entry is not a {expected}")]
    WrongEntry { expected: String },
}

/// Result type alias for healthrs operations
pub type Result<T> = std::result::Result<T, HealthRsError>;

impl HealthRsError {
    /// Empty-input outcomes that are reported rather than treated as crashes
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            HealthRsError::NoData { .. } | HealthRsError::NotFound { .. }
        )
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        if self.is_no_data() {
            2
        } else {
            1
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HealthRsError::NoData { .. } | HealthRsError::NotFound { .. } => ErrorSeverity::Warning,
            HealthRsError::Validation(_) => ErrorSeverity::Warning,
            HealthRsError::Extract(ExtractError::InvalidTimestamp { .. }) => ErrorSeverity::Warning,
            HealthRsError::InputNotFound { .. } => ErrorSeverity::Error,
            HealthRsError::Extract(_) => ErrorSeverity::Error,
            HealthRsError::Configuration(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            HealthRsError::InputNotFound { path } => {
                format!(
                    "Could not find the health export at {}. Export it from the Health app and pass --input.",
                    path.display()
                )
            }
            HealthRsError::NoData { report, reason } => {
                format!("No data for the {} report: {}", report, reason)
            }
            HealthRsError::NotFound { what } => format!("Nothing found: {}", what),
            HealthRsError::Extract(ExtractError::Xml { position, .. }) => {
                format!("The export file is not valid XML (near byte {})", position)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Configuration or internal error that stops every report
    Critical,
    /// Error that stops the current report
    Error,
    /// Outcome worth reporting that is not a malfunction
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
