//! Tabular data source loading.
//!
//! A data source is a single CSV or spreadsheet file whose first row names
//! the columns. Every following non-blank row becomes a [`CandidateRow`].
//! Only the first sheet of a workbook is read.

mod delimited;
mod spreadsheet;

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// One data row: column name to cell value, in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    fields: Vec<(String, String)>,
}

impl CandidateRow {
    /// Build a row from header names and raw cells.
    ///
    /// Missing trailing cells become empty strings and cells beyond the
    /// header are dropped, so every row carries exactly the header's columns.
    pub fn from_cells(columns: &[String], cells: Vec<String>) -> Self {
        let mut cells = cells.into_iter();
        let fields = columns
            .iter()
            .map(|name| (name.clone(), cells.next().unwrap_or_default()))
            .collect();
        Self { fields }
    }

    /// Value of `column`, if the row has that column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate `(column, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.trim().is_empty())
    }
}

/// Supported data source formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Spreadsheet,
}

impl DataFormat {
    /// Detect the format from a path's extension (case-insensitive).
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xlsm" | "xls" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }
}

/// A loaded data source: header plus rows.
#[derive(Debug, Clone)]
pub struct DataSource {
    path: PathBuf,
    columns: Vec<String>,
    rows: Vec<CandidateRow>,
}

impl DataSource {
    /// Load a CSV or spreadsheet file.
    ///
    /// A header without data rows loads fine; callers that need rows check
    /// [`require_rows`](Self::require_rows) after the column.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = DataFormat::detect(path)
            .ok_or_else(|| ConfigError::UnsupportedDataSource(path.to_path_buf()))?;

        let (columns, raw_rows) = match format {
            DataFormat::Csv => delimited::read_table(path)?,
            DataFormat::Spreadsheet => spreadsheet::read_first_sheet(path)?,
        };

        let source = Self::from_table(path, columns, raw_rows);

        tracing::info!(
            "Loaded {} row(s) with columns [{}] from {:?}",
            source.rows.len(),
            source.columns.join(", "),
            path
        );
        Ok(source)
    }

    /// Assemble a data source from an already-parsed header and cells.
    pub fn from_table(path: &Path, columns: Vec<String>, raw_rows: Vec<Vec<String>>) -> Self {
        let columns: Vec<String> = columns
            .into_iter()
            .map(|c| c.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let rows = raw_rows
            .into_iter()
            .map(|cells| CandidateRow::from_cells(&columns, cells))
            .filter(|row| !row.is_blank())
            .collect();

        Self {
            path: path.to_path_buf(),
            columns,
            rows,
        }
    }

    /// Path the data source was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header row, in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Data rows.
    pub fn rows(&self) -> &[CandidateRow] {
        &self.rows
    }

    /// Check that `column` names a header column.
    ///
    /// The error lists the available columns so the user can correct the flag.
    pub fn require_column(&self, column: Option<&str>) -> Result<(), ConfigError> {
        match column {
            Some(name) if self.columns.iter().any(|c| c == name) => Ok(()),
            _ => Err(ConfigError::MissingColumn {
                column: column.map(String::from),
                available: self.columns.clone(),
            }),
        }
    }

    /// Check that at least one data row was read.
    pub fn require_rows(&self) -> Result<(), ConfigError> {
        if self.rows.is_empty() {
            return Err(self.empty_error());
        }
        Ok(())
    }

    pub(crate) fn empty_error(&self) -> ConfigError {
        ConfigError::EmptyDataSource {
            path: self.path.clone(),
            available: self.columns.clone(),
        }
    }
}
