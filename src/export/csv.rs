use std::path::Path;

use super::{ExportError, ReportTable};

/// Rows of a sheet read back from disk, all cells as text
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetData {
    /// Index of the column with this header
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == header)
    }
}

/// Write one report table as a CSV sheet (header row first)
pub fn write_sheet<P: AsRef<Path>>(table: &ReportTable, output_path: P) -> Result<(), ExportError> {
    let mut writer = ::csv::Writer::from_path(output_path.as_ref())?;

    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.display()))?;
    }
    writer.flush()?;

    Ok(())
}

/// Read a CSV sheet written by [`write_sheet`]
pub fn read_sheet<P: AsRef<Path>>(input_path: P) -> Result<SheetData, ExportError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(input_path.as_ref())?;

    let headers = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }

    Ok(SheetData { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::Cell;
    use chrono::NaiveDate;
    use tempfile::NamedTempFile;

    fn sample_table() -> ReportTable {
        let mut table = ReportTable::new(
            "weight_vo2max",
            "Weight_vs_VO2",
            "Weight vs VO2max",
            &["Date", "Weight, kg", "VO2max", "Note"],
        );
        table.push_row(vec![
            Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()),
            Cell::Empty,
            Cell::number(45.0, 2),
            Cell::text("no weight, within \"7\" days"),
        ]);
        table.push_row(vec![
            Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 12).unwrap()),
            Cell::number(81.19123, 2),
            Cell::number(46.5, 2),
            Cell::Empty,
        ]);
        table
    }

    #[test]
    fn test_sheet_round_trip() {
        let temp_file = NamedTempFile::new().unwrap();
        write_sheet(&sample_table(), temp_file.path()).unwrap();

        let sheet = read_sheet(temp_file.path()).unwrap();
        assert_eq!(sheet.headers, vec!["Date", "Weight, kg", "VO2max", "Note"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0][1], "");
        assert_eq!(sheet.rows[0][3], "no weight, within \"7\" days");
        assert_eq!(sheet.rows[1][1], "81.19");
        assert_eq!(sheet.column("VO2max"), Some(2));
        assert_eq!(sheet.column("Missing"), None);
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no").join("such").join("sheet.csv");
        assert!(write_sheet(&sample_table(), path).is_err());
    }
}
