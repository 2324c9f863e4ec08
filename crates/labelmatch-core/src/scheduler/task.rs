//! One image's lifecycle: match, decide, copy, report.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::cancel::CancelToken;
use super::discovery::ImageTask;
use crate::error::PipelineResult;
use crate::labels::CandidateLabelSet;
use crate::matcher::LabelMatcher;
use crate::rename::{self, RenameDecision};

/// Where a task is in its lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Dispatched,
    Completed,
    Failed,
}

/// How a task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Copied to `dest`
    Renamed { dest: PathBuf },
    /// The model found no label, or the label was unusable
    NoMatch,
    /// The worker failed; the message is for the status line
    Failed(String),
    /// The run was cancelled before this task was dispatched
    Cancelled,
}

/// Terminal report for one task. Exactly one is produced per task.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task: ImageTask,
    pub status: TaskStatus,
    pub elapsed: Duration,
}

impl TaskReport {
    pub fn state(&self) -> TaskState {
        match self.status {
            TaskStatus::Renamed { .. } | TaskStatus::NoMatch => TaskState::Completed,
            TaskStatus::Failed(_) | TaskStatus::Cancelled => TaskState::Failed,
        }
    }
}

impl fmt::Display for TaskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let src = self.task.file_name();
        match &self.status {
            TaskStatus::Renamed { dest } => {
                let dest = dest
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| dest.display().to_string());
                write!(f, "Renamed {src} to {dest}")
            }
            TaskStatus::NoMatch => write!(f, "No match found for {src}"),
            TaskStatus::Failed(message) => write!(f, "Error processing {src}: {message}"),
            TaskStatus::Cancelled => write!(f, "Cancelled before dispatch: {src}"),
        }
    }
}

/// Everything a worker needs, shared read-only across all workers.
pub struct ImagePipeline {
    matcher: Arc<dyn LabelMatcher>,
    decision: RenameDecision,
    labels: CandidateLabelSet,
}

impl ImagePipeline {
    pub fn new(
        matcher: Arc<dyn LabelMatcher>,
        decision: RenameDecision,
        labels: CandidateLabelSet,
    ) -> Self {
        Self {
            matcher,
            decision,
            labels,
        }
    }

    pub fn labels(&self) -> &CandidateLabelSet {
        &self.labels
    }

    /// Match one image and copy it if a label was found.
    pub async fn run(&self, path: &Path, cancel: &CancelToken) -> PipelineResult<TaskStatus> {
        let outcome = self.matcher.match_image(path, &self.labels, cancel).await?;
        let action = self.decision.decide(path, &outcome);
        Ok(match rename::apply(&action, path).await? {
            Some(dest) => TaskStatus::Renamed { dest },
            None => TaskStatus::NoMatch,
        })
    }
}
