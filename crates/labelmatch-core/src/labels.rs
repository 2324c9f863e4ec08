//! The candidate label vocabulary offered to the matcher.

use crate::datasource::DataSource;
use crate::error::ConfigError;
use std::collections::HashSet;
use std::sync::Arc;

/// Values of the match column, built once per run and shared read-only by
/// every worker. Cloning is a reference-count bump.
#[derive(Debug, Clone)]
pub struct CandidateLabelSet {
    column: Arc<str>,
    labels: Arc<[String]>,
}

impl CandidateLabelSet {
    /// Extract the labels of `column` from every row of `source`.
    ///
    /// Values are trimmed, blanks are dropped, and duplicates keep their
    /// first position.
    pub fn from_source(source: &DataSource, column: &str) -> Result<Self, ConfigError> {
        source.require_column(Some(column))?;
        let values = source.rows().iter().filter_map(|row| row.get(column));
        let set = Self::from_values(column, values);
        if set.is_empty() {
            return Err(source.empty_error());
        }
        Ok(set)
    }

    /// Build a label set from raw values.
    pub fn from_values<'a, I>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let labels: Vec<String> = values
            .into_iter()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .filter(|v| seen.insert(v.to_string()))
            .map(String::from)
            .collect();

        Self {
            column: Arc::from(column),
            labels: Arc::from(labels),
        }
    }

    /// Name of the column the labels came from.
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Labels joined with `", "`, as they appear in the prompt.
    pub fn joined(&self) -> String {
        self.labels.join(", ")
    }
}
