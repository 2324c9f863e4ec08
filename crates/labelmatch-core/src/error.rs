//! Error types for the labelmatch pipeline.
//!
//! Errors are split by blast radius: [`ConfigError`] aborts a run before any
//! image is dispatched, [`PipelineError`] and [`MatchParseError`] stay local
//! to the one image they happened on.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for labelmatch operations.
#[derive(Error, Debug)]
pub enum LabelMatchError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fatal, pre-dispatch errors: bad config file, missing inputs, bad column.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// The images directory does not exist or is not a directory
    #[error("Images directory not found: {0}")]
    InputDirMissing(PathBuf),

    /// The data source could not be opened or decoded
    #[error("Failed to read data source {path}: {message}")]
    DataSourceRead { path: PathBuf, message: String },

    /// The data source has an extension we cannot load
    #[error("Unsupported data source format: {0} (expected .csv, .xlsx or .xls)")]
    UnsupportedDataSource(PathBuf),

    /// The data source (or its match column) has no values
    #[error(
        "Data source {path} contains no rows. Available columns: {}",
        .available.join(", ")
    )]
    EmptyDataSource {
        path: PathBuf,
        available: Vec<String>,
    },

    /// The requested match column is not in the header row
    #[error(
        "Please provide a valid column name from the data source. Available columns: {}",
        .available.join(", ")
    )]
    MissingColumn {
        column: Option<String>,
        available: Vec<String>,
    },
}

/// Per-image errors. These never abort the run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The image could not be read
    #[error("Failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copying the image to its destination failed
    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// LLM request failed
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        status_code: Option<u16>,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// The run was cancelled while this image was in flight
    #[error("Cancelled while processing {0}")]
    Cancelled(PathBuf),

    /// The worker running this image terminated abnormally
    #[error("Worker for {path} terminated abnormally: {message}")]
    Task { path: PathBuf, message: String },
}

/// The model's reply did not decode as `[bool, "label"]`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchParseError {
    /// Reply was empty or whitespace only
    #[error("empty response")]
    Empty,

    /// Reply was wrapped in a markdown code fence
    #[error("response is wrapped in a code fence: {0}")]
    Fenced(String),

    /// Reply was not a two-element `[bool, string]` JSON array
    #[error("expected [bool, \"label\"], got {text}: {reason}")]
    Malformed { text: String, reason: String },
}

/// Convenience type alias for labelmatch results.
pub type Result<T> = std::result::Result<T, LabelMatchError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
