//! The `labelmatch run` command.

use anyhow::Context;
use clap::Args;
use labelmatch_core::{CancelToken, Config, RunSummary, Session, TaskReport};
use std::path::PathBuf;
use std::sync::Arc;

use super::types::LlmProvider;

/// Arguments for the `run` command.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Data source column whose values are the candidate labels
    #[arg(short, long, env = "LABELMATCH_COLUMN")]
    pub column: Option<String>,

    /// Directory of images to match (overrides general.input_dir)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Directory that receives the renamed copies (overrides general.output_dir)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// CSV or XLSX data source (overrides general.data_file)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// LLM provider (overrides llm.default_provider)
    #[arg(long, value_enum)]
    pub llm: Option<LlmProvider>,

    /// LLM model name (provider-specific)
    #[arg(long)]
    pub llm_model: Option<String>,

    /// Maximum concurrent workers (defaults to 80% of available cores)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Retries per image for transient LLM failures
    #[arg(long)]
    pub retries: Option<u32>,
}

impl RunArgs {
    /// Apply CLI overrides on top of the loaded config.
    fn apply(&self, config: &mut Config) {
        if let Some(input) = &self.input {
            config.general.input_dir = input.clone();
        }
        if let Some(output) = &self.output {
            config.general.output_dir = output.clone();
        }
        if let Some(data) = &self.data {
            config.general.data_file = data.clone();
        }
        if let Some(llm) = self.llm {
            config.llm.default_provider = llm.to_string();
        }
        if let Some(workers) = self.workers {
            config.scheduler.max_workers = Some(workers);
        }
        if let Some(retries) = self.retries {
            config.pipeline.retry_attempts = retries;
        }
    }
}

/// Execute the run command against the config loaded at startup.
pub async fn execute(args: RunArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply(&mut config);

    let session = Session::prepare(&config, args.column.as_deref())?;
    if session.tasks().is_empty() {
        tracing::warn!("No files found in {:?}", session.input_dir());
        return Ok(());
    }

    let matcher = Session::build_matcher(&config, None, args.llm_model.as_deref())
        .context("Failed to set up the LLM provider")?;
    if !matcher.is_available().await {
        tracing::warn!(
            "{} is not reachable, images will be reported as unmatched",
            matcher.provider_name()
        );
    }
    tracing::info!(
        "Using {} with up to {} workers",
        matcher.provider_name(),
        session.cap()
    );

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight images");
            trigger.cancel();
        }
    });

    let progress = create_progress_bar(session.tasks().len() as u64);
    let bar = progress.clone();
    let summary = session
        .run(Arc::new(matcher), &cancel, move |report| {
            print_status(&bar, report);
        })
        .await?;
    progress.finish_and_clear();

    print_summary(&summary);
    Ok(())
}

/// Write one status line to stdout without tearing the progress bar.
fn print_status(bar: &indicatif::ProgressBar, report: &TaskReport) {
    if bar.is_hidden() {
        println!("{report}");
    } else {
        bar.println(report.to_string());
    }
    bar.inc(1);
}

fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb
}

/// Print a formatted summary table after the run.
fn print_summary(summary: &RunSummary) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Renamed:      {:>8}", summary.renamed);
    eprintln!("    No match:     {:>8}", summary.unmatched);
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    if summary.cancelled > 0 {
        eprintln!("    Cancelled:    {:>8}", summary.cancelled);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", summary.total());
    eprintln!("    Peak workers: {:>8}", summary.max_in_flight);
    eprintln!("    Duration:     {:>7.1}s", summary.elapsed.as_secs_f64());
    eprintln!("  ====================================");
}
