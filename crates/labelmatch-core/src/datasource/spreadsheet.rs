//! Spreadsheet reader: first sheet only, first row is the header.

use crate::error::ConfigError;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

/// Read the first worksheet of a workbook into `(header, rows)`.
pub(super) fn read_first_sheet(
    path: &Path,
) -> Result<(Vec<String>, Vec<Vec<String>>), ConfigError> {
    let read_error = |message: String| ConfigError::DataSourceRead {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook =
        open_workbook_auto(path).map_err(|e| read_error(format!("failed to open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| read_error("workbook has no sheets".to_string()))?
        .map_err(|e| read_error(format!("failed to read first sheet: {e}")))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<String>>());
    let columns: Vec<String> = rows.next().unwrap_or_default();
    let rows: Vec<Vec<String>> = rows.collect();

    tracing::debug!(
        "Read {} row(s) from first sheet of {:?}",
        rows.len(),
        path
    );
    Ok((columns, rows))
}

/// Render a cell the way a CSV export would.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text_integral_float() {
        assert_eq!(cell_text(&Data::Float(42.0)), "42");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
    }

    #[test]
    fn test_cell_text_trims_strings() {
        assert_eq!(cell_text(&Data::String("  Tomato ".into())), "Tomato");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    fn fixture() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/produce.xlsx")
    }

    #[test]
    fn test_read_first_sheet_of_workbook() {
        let (columns, rows) = read_first_sheet(&fixture()).unwrap();

        assert_eq!(columns, ["name", "region", "code"]);
        assert_eq!(
            rows,
            vec![
                vec!["Tomato", "EU", "101"],
                vec!["Carrot", "US", "202"],
                vec!["Green Pepper", "EU", "303"],
            ]
        );
    }

    #[test]
    fn test_second_sheet_is_ignored() {
        let (columns, rows) = read_first_sheet(&fixture()).unwrap();
        assert!(!columns.iter().any(|c| c == "other"));
        assert!(rows.iter().flatten().all(|cell| cell != "Banana"));
    }

    #[test]
    fn test_read_first_sheet_missing_file() {
        let err = read_first_sheet(Path::new("/definitely/not/here.xlsx")).unwrap_err();
        assert!(matches!(err, ConfigError::DataSourceRead { .. }));
    }
}
