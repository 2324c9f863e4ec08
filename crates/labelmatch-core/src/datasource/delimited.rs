//! CSV reader. The first record is the header.

use crate::error::ConfigError;
use std::path::Path;

/// Read a CSV file into `(header, rows)`.
///
/// Records are allowed to have a different field count than the header;
/// [`super::CandidateRow::from_cells`] normalizes them.
pub(super) fn read_table(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>), ConfigError> {
    let read_error = |e: ::csv::Error| ConfigError::DataSourceRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut reader = ::csv::ReaderBuilder::new()
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_path(path)
        .map_err(read_error)?;

    let columns = reader
        .headers()
        .map_err(read_error)?
        .iter()
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(read_error)?;
        rows.push(record.iter().map(String::from).collect());
    }

    Ok((columns, rows))
}
