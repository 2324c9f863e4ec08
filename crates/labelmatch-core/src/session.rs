//! A prepared run: everything checked before the first image is dispatched.
//!
//! [`Session::prepare`] performs every whole-run check (config values,
//! images directory, match column, data source rows) so that a run either
//! aborts with a [`ConfigError`] or dispatches every enumerated file.

use crate::config::Config;
use crate::datasource::DataSource;
use crate::error::{ConfigError, LabelMatchError, PipelineError};
use crate::labels::CandidateLabelSet;
use crate::llm::LlmProviderFactory;
use crate::matcher::{LabelMatcher, LlmMatcher, MatchOptions};
use crate::rename::RenameDecision;
use crate::scheduler::{
    resolve_cap, CancelToken, FileDiscovery, ImagePipeline, ImageTask, RunSummary, Scheduler,
    TaskReport,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct Session {
    input_dir: PathBuf,
    output_dir: PathBuf,
    columns: Vec<String>,
    labels: CandidateLabelSet,
    tasks: Vec<ImageTask>,
    cap: usize,
}

impl Session {
    /// Validate inputs and enumerate the images for one run.
    pub fn prepare(config: &Config, column: Option<&str>) -> Result<Self, ConfigError> {
        config.validate()?;

        let input_dir = config.input_dir();
        if !input_dir.is_dir() {
            return Err(ConfigError::InputDirMissing(input_dir));
        }

        let source = DataSource::load(&config.data_file())?;
        source.require_column(column)?;
        source.require_rows()?;
        let column = column.unwrap_or_default();
        let labels = CandidateLabelSet::from_source(&source, column)?;

        let tasks = FileDiscovery::new(config.processing.clone()).discover(&input_dir)?;
        let cap = resolve_cap(&config.scheduler);

        tracing::info!(
            "Matching {} images against {} labels from column '{}'",
            tasks.len(),
            labels.len(),
            labels.column()
        );

        Ok(Self {
            input_dir,
            output_dir: config.output_dir(),
            columns: source.columns().to_vec(),
            labels,
            tasks,
            cap,
        })
    }

    /// Build the production matcher for `provider` (or the configured default).
    pub fn build_matcher(
        config: &Config,
        provider: Option<&str>,
        model: Option<&str>,
    ) -> Result<LlmMatcher, PipelineError> {
        let provider = provider.unwrap_or(config.llm.default_provider.as_str());
        let llm = LlmProviderFactory::create(provider, &config.llm, model)?;
        let options = MatchOptions {
            retry_attempts: config.pipeline.retry_attempts,
            retry_delay_ms: config.pipeline.retry_delay_ms,
            timeout_ms: config.limits.llm_timeout_ms,
            max_file_size_mb: config.limits.max_file_size_mb,
        };
        Ok(LlmMatcher::new(llm, options))
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn labels(&self) -> &CandidateLabelSet {
        &self.labels
    }

    pub fn tasks(&self) -> &[ImageTask] {
        &self.tasks
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Override the worker cap resolved from config.
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap.max(1);
        self
    }

    /// Run every enumerated image through `matcher`.
    pub async fn run<F>(
        &self,
        matcher: Arc<dyn LabelMatcher>,
        cancel: &CancelToken,
        on_report: F,
    ) -> Result<RunSummary, LabelMatchError>
    where
        F: Fn(&TaskReport) + Send + Sync + 'static,
    {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let pipeline = Arc::new(ImagePipeline::new(
            matcher,
            RenameDecision::new(self.output_dir.clone()),
            self.labels.clone(),
        ));
        let summary = Scheduler::new(self.cap)
            .run(self.tasks.clone(), pipeline, cancel, on_report)
            .await;

        tracing::info!(
            "Finished in {:.1}s: {} renamed, {} unmatched, {} failed, {} cancelled (peak {} workers)",
            summary.elapsed.as_secs_f64(),
            summary.renamed,
            summary.unmatched,
            summary.failed,
            summary.cancelled,
            summary.max_in_flight
        );
        Ok(summary)
    }
}
