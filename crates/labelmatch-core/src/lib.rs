//! labelmatch core - match images to data-source labels with a vision LLM.
//!
//! Every image in a flat directory is shown to a vision model together with
//! the values of one column of a CSV or spreadsheet. When the model picks a
//! value, the image is copied to `<output>/<label><ext>`.
//!
//! # Architecture
//!
//! ```text
//! DataSource → CandidateLabelSet ─┐
//!                                 ├→ Scheduler (≤ cap workers) → LabelMatcher → RenameDecision → copy
//! FileDiscovery → ImageTask ──────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use labelmatch_core::{CancelToken, Config, Session};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> labelmatch_core::Result<()> {
//!     let config = Config::load()?;
//!     let session = Session::prepare(&config, Some("name"))?;
//!     let matcher = Arc::new(Session::build_matcher(&config, None, None)?);
//!
//!     let summary = session
//!         .run(matcher, &CancelToken::new(), |report| println!("{report}"))
//!         .await?;
//!     println!("{} renamed", summary.renamed);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod datasource;
pub mod error;
pub mod labels;
pub mod llm;
pub mod matcher;
pub mod rename;
pub mod scheduler;
pub mod session;

pub use config::Config;
pub use datasource::{CandidateRow, DataSource};
pub use error::{
    ConfigError, LabelMatchError, MatchParseError, PipelineError, PipelineResult, Result,
};
pub use labels::CandidateLabelSet;
pub use matcher::{LabelMatcher, LlmMatcher, MatchOptions, MatchOutcome};
pub use rename::{Action, RenameDecision};
pub use scheduler::{CancelToken, RunSummary, Scheduler, TaskReport, TaskStatus};
pub use session::Session;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
