//! Bounded worker pool: one spawned task per image, at most `cap` at once.
//!
//! Admission is a counting semaphore acquired in enumeration order, so
//! dispatch is FIFO. Drain joins every worker through a `JoinSet`. A worker
//! that panics is reported as failed and its siblings keep running.

mod cancel;
mod discovery;
mod pool;
mod task;

pub use cancel::CancelToken;
pub use discovery::{FileDiscovery, ImageTask};
pub use pool::{available_parallelism, resolve_cap, worker_cap};
pub use task::{ImagePipeline, TaskReport, TaskState, TaskStatus};

use crate::error::PipelineError;
use pool::InFlight;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Totals for one run.
///
/// `cancelled` counts tasks that were never dispatched. A task cancelled
/// while in flight counts as `failed`.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub dispatched: usize,
    pub renamed: usize,
    pub unmatched: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Highest number of workers observed running at once
    pub max_in_flight: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Number of tasks that reached a terminal report.
    pub fn total(&self) -> usize {
        self.renamed + self.unmatched + self.failed + self.cancelled
    }

    fn record(&mut self, report: &TaskReport) {
        match report.status {
            TaskStatus::Renamed { .. } => self.renamed += 1,
            TaskStatus::NoMatch => self.unmatched += 1,
            TaskStatus::Failed(_) => self.failed += 1,
            TaskStatus::Cancelled => self.cancelled += 1,
        }
    }
}

/// Dispatches image tasks under a fixed worker cap.
pub struct Scheduler {
    cap: usize,
}

impl Scheduler {
    /// A cap of zero is raised to one.
    pub fn new(cap: usize) -> Self {
        Self { cap: cap.max(1) }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Run every task through `pipeline` and wait for all of them.
    ///
    /// `on_report` is called once per task, in completion order, from the
    /// worker that finished it. Tasks still waiting for a slot when `cancel`
    /// fires are reported as [`TaskStatus::Cancelled`] without being started.
    pub async fn run<F>(
        &self,
        tasks: Vec<ImageTask>,
        pipeline: Arc<ImagePipeline>,
        cancel: &CancelToken,
        on_report: F,
    ) -> RunSummary
    where
        F: Fn(&TaskReport) + Send + Sync + 'static,
    {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.cap));
        let gauge = InFlight::new(self.cap);
        let on_report = Arc::new(on_report);
        let mut workers = JoinSet::new();
        let mut summary = RunSummary::default();

        tracing::info!("Dispatching {} images with {} workers", tasks.len(), self.cap);

        let mut pending = tasks.into_iter();
        while let Some(task) = pending.next() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                let skipped = std::iter::once(task).chain(pending.by_ref());
                for task in skipped {
                    let report = TaskReport {
                        task,
                        status: TaskStatus::Cancelled,
                        elapsed: Duration::ZERO,
                    };
                    on_report(&report);
                    summary.record(&report);
                }
                tracing::warn!("Run cancelled, {} images not dispatched", summary.cancelled);
                break;
            };

            let guard = gauge.enter();
            summary.dispatched += 1;
            tracing::debug!(
                index = task.index,
                state = ?TaskState::Dispatched,
                in_flight = gauge.current(),
                "{}",
                task.file_name()
            );

            let pipeline = pipeline.clone();
            let cancel = cancel.clone();
            let on_report = on_report.clone();

            workers.spawn(async move {
                let task_started = Instant::now();
                let path = task.path.clone();

                // The pipeline runs in its own task so a panic inside it
                // surfaces here as a JoinError instead of unwinding this one.
                let worker = tokio::spawn({
                    let path = path.clone();
                    async move { pipeline.run(&path, &cancel).await }
                });

                let status = match worker.await {
                    Ok(Ok(status)) => status,
                    Ok(Err(e)) => {
                        tracing::debug!("{e}");
                        TaskStatus::Failed(e.to_string())
                    }
                    Err(e) => {
                        let err = PipelineError::Task {
                            path,
                            message: e.to_string(),
                        };
                        tracing::error!("{err}");
                        TaskStatus::Failed(err.to_string())
                    }
                };

                drop(guard);
                drop(permit);

                let report = TaskReport {
                    task,
                    status,
                    elapsed: task_started.elapsed(),
                };
                on_report(&report);
                report
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(report) => summary.record(&report),
                Err(e) => {
                    tracing::error!("Worker supervisor terminated abnormally: {e}");
                    summary.failed += 1;
                }
            }
        }

        summary.max_in_flight = gauge.peak();
        summary.elapsed = started.elapsed();
        summary
    }
}
