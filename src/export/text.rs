use super::{ExportError, ReportTable};
use std::io::Write;
use std::path::Path;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Render a report table as a bordered text table, header row first
pub fn render_table(table: &ReportTable) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.headers.iter().cloned());
    for row in &table.rows {
        builder.push_record(row.iter().map(|cell| cell.display()));
    }

    let mut rendered = builder.build();
    rendered.with(Style::rounded());
    rendered.to_string()
}

/// Export a report table as human-readable text
pub fn write_sheet<P: AsRef<Path>>(table: &ReportTable, output_path: P) -> Result<(), ExportError> {
    let mut file = std::fs::File::create(output_path)?;

    writeln!(file, "{}", table.title)?;
    writeln!(file)?;
    writeln!(file, "{}", render_table(table))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::Cell;
    use tempfile::NamedTempFile;

    fn zone_table() -> ReportTable {
        let mut table = ReportTable::new("last_walk_summary", "Summary", "Last walk", &["Metric", "Value"]);
        table.push_row(vec![Cell::text("Zone 1"), Cell::text("0:20:00")]);
        table.push_row(vec![Cell::text("Distance"), Cell::number(4.5, 2)]);
        table
    }

    #[test]
    fn test_render_table_contains_cells() {
        let rendered = render_table(&zone_table());
        assert!(rendered.contains("Metric"));
        assert!(rendered.contains("Zone 1"));
        assert!(rendered.contains("4.50"));
        assert!(rendered.lines().count() >= 5);
    }

    #[test]
    fn test_write_text_sheet() {
        let temp_file = NamedTempFile::new().unwrap();
        write_sheet(&zone_table(), temp_file.path()).unwrap();
        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.starts_with("Last walk"));
        assert!(content.contains("0:20:00"));
    }
}
