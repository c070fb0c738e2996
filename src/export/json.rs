use super::{ExportError, ReportTable};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Serialize)]
struct JsonSheet<'a> {
    sheet: &'a str,
    title: &'a str,
    headers: &'a [String],
    rows: Vec<Vec<serde_json::Value>>,
}

/// Export one report table as JSON
pub fn write_sheet<P: AsRef<Path>>(table: &ReportTable, output_path: P) -> Result<(), ExportError> {
    let sheet = JsonSheet {
        sheet: &table.sheet,
        title: &table.title,
        headers: &table.headers,
        rows: table
            .rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_json()).collect())
            .collect(),
    };
    export_json(&sheet, output_path)
}

/// Export any serializable data structure to JSON
pub fn export_json<T, P>(data: &T, output_path: P) -> Result<(), ExportError>
where
    T: serde::Serialize,
    P: AsRef<Path>,
{
    let json_data = serde_json::to_string_pretty(data)
        .map_err(|e| ExportError::SerializationError(e.to_string()))?;

    let mut file = std::fs::File::create(output_path)?;
    file.write_all(json_data.as_bytes())?;
    file.write_all(b"\n")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::Cell;
    use chrono::NaiveDate;
    use tempfile::NamedTempFile;

    #[test]
    fn test_export_sheet_json() {
        let mut table = ReportTable::new("vo2max", "VO2max", "VO2max by day", &["Date", "VO2max", "Change"]);
        table.push_row(vec![
            Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            Cell::number(42.0, 2),
            Cell::Empty,
        ]);

        let temp_file = NamedTempFile::new().unwrap();
        write_sheet(&table, temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["sheet"], "VO2max");
        assert_eq!(value["headers"][1], "VO2max");
        assert_eq!(value["rows"][0][0], "2024-01-01");
        assert_eq!(value["rows"][0][1], 42.0);
        assert!(value["rows"][0][2].is_null());
    }
}
