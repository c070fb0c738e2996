use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub mod csv;
pub mod json;
pub mod text;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One spreadsheet-compatible CSV file per sheet
    Csv,
    Json,
    /// Plain text rendering of the console tables
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Text => "txt",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" | "sheet" | "spreadsheet" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "text" | "txt" => Ok(ExportFormat::Text),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Failed to write {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },
}

/// A typed spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Integer(i64),
    /// Rendered with exactly `decimals` fractional digits
    Number { value: f64, decimals: usize },
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn number(value: f64, decimals: usize) -> Self {
        if value.is_finite() {
            Cell::Number { value, decimals }
        } else {
            Cell::Empty
        }
    }

    pub fn opt_number(value: Option<f64>, decimals: usize) -> Self {
        value.map_or(Cell::Empty, |v| Cell::number(v, decimals))
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Integer(i) => i.to_string(),
            Cell::Number { value, decimals } => {
                let rendered = format!("{:.*}", decimals, value);
                // "-0.00" reads as a sign error in a sheet
                if rendered.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
                    rendered.trim_start_matches('-').to_string()
                } else {
                    rendered
                }
            }
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Time(t) => t.format("%H:%M:%S").to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// JSON value with numbers rounded to their declared precision
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Empty => serde_json::Value::Null,
            Cell::Integer(i) => serde_json::Value::from(*i),
            Cell::Number { value, decimals } => {
                let factor = 10f64.powi(*decimals as i32);
                serde_json::Value::from((value * factor).round() / factor)
            }
            other => serde_json::Value::String(other.display()),
        }
    }
}

/// One sheet of a report: header row plus one row per bucket
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    /// File stem used for every output format
    pub name: String,
    pub sheet: String,
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    pub fn new(name: &str, sheet: &str, title: &str, headers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            sheet: sheet.to_string(),
            title: title.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn file_name(&self, format: ExportFormat) -> String {
        format!("{}.{}", self.name, format.extension())
    }
}

/// Writes every table in every format into `directory`, returning the paths written
pub fn write_report(
    tables: &[ReportTable],
    directory: &Path,
    formats: &[ExportFormat],
) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(directory).map_err(|e| ExportError::WriteFailed {
        path: directory.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut written = Vec::new();
    for format in formats {
        for table in tables {
            let path = directory.join(table.file_name(*format));
            match format {
                ExportFormat::Csv => csv::write_sheet(table, &path)?,
                ExportFormat::Json => json::write_sheet(table, &path)?,
                ExportFormat::Text => text::write_sheet(table, &path)?,
            }
            info!("Wrote {} ({} rows)", path.display(), table.len());
            written.push(path);
        }
    }
    Ok(written)
}

/// `H:MM:SS` for a number of seconds
pub fn format_hms(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as i64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// `M'SS"` per km for a pace in seconds per kilometer
pub fn format_pace(sec_per_km: f64) -> String {
    if !sec_per_km.is_finite() || sec_per_km <= 0.0 {
        return String::new();
    }
    let total = sec_per_km.round() as i64;
    format!("{}'{:02}\"/km", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!(matches!(
            "xlsx".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::number(45.0, 2).display(), "45.00");
        assert_eq!(Cell::number(2.0 / 3.0, 3).display(), "0.667");
        assert_eq!(Cell::number(-0.001, 2).display(), "0.00");
        assert_eq!(Cell::number(f64::NAN, 2), Cell::Empty);
        assert_eq!(Cell::opt_number(None, 2).display(), "");
        assert_eq!(
            Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()).display(),
            "2024-01-03"
        );
        assert_eq!(Cell::Integer(7).display(), "7");
    }

    #[test]
    fn test_cell_json_rounding() {
        assert_eq!(Cell::number(81.19123, 2).to_json(), serde_json::json!(81.19));
        assert_eq!(Cell::Empty.to_json(), serde_json::Value::Null);
        assert_eq!(Cell::text("Zone 1").to_json(), serde_json::json!("Zone 1"));
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_hms(3600.0), "1:00:00");
        assert_eq!(format_hms(800.0), "0:13:20");
        assert_eq!(format_pace(800.0), "13'20\"/km");
        assert_eq!(format_pace(0.0), "");
    }

    #[test]
    fn test_write_report_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");

        let mut table = ReportTable::new("vo2max", "VO2max", "VO2max by day", &["Date", "VO2max"]);
        table.push_row(vec![
            Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()),
            Cell::number(45.0, 2),
        ]);

        let written = write_report(&[table], &out, &[ExportFormat::Csv, ExportFormat::Json]).unwrap();
        assert_eq!(written.len(), 2);
        assert!(out.join("vo2max.csv").exists());
        assert!(out.join("vo2max.json").exists());
    }
}
