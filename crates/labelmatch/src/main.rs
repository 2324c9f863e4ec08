//! labelmatch CLI - rename images after the data-source label a vision LLM picks.
//!
//! Every image in a flat directory is compared with the values of one column
//! of a CSV or spreadsheet; matches are copied to `<output>/<label><ext>`.
//!
//! # Usage
//!
//! ```bash
//! # Match ./images against the "name" column of data/datasource.csv
//! labelmatch run --column name
//!
//! # List the columns a data source offers
//! labelmatch columns --data products.xlsx
//!
//! # View configuration
//! labelmatch config show
//! ```

use clap::{Parser, Subcommand};
use labelmatch_core::{Config, ConfigError, LabelMatchError};
use std::process::ExitCode;

mod cli;
mod logging;

/// labelmatch - match images to data-source labels with a vision LLM.
#[derive(Parser, Debug)]
#[command(name = "labelmatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Match every image against a data-source column and copy the matches
    Run(cli::run::RunArgs),

    /// List the columns of a data source
    Columns(cli::columns::ColumnsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

/// Exit code for runs aborted before any image was dispatched.
const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // API keys may live in a .env file next to the data.
    let dotenv = dotenvy::dotenv();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let loaded = Config::load();
    let log_config = match &loaded {
        Ok(config) => config.clone(),
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Logging with default settings. Check your config file with `labelmatch config path`."
            );
            Config::default()
        }
    };
    logging::init_from_config(&log_config, cli.verbose, cli.json_logs);

    tracing::debug!("labelmatch v{}", labelmatch_core::VERSION);
    match dotenv {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Failed to load .env: {e}"),
    }

    match dispatch(cli.command, loaded).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Run one subcommand. Commands that need a valid config fail on a load
/// error; `config` inspects the file itself.
async fn dispatch(command: Commands, loaded: Result<Config, ConfigError>) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => cli::run::execute(args, loaded?).await,
        Commands::Columns(args) => cli::columns::execute(args, loaded?).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}

fn exit_code(error: &anyhow::Error) -> u8 {
    let is_config = error.chain().any(|cause| {
        cause.is::<ConfigError>()
            || matches!(
                cause.downcast_ref::<LabelMatchError>(),
                Some(LabelMatchError::Config(_))
            )
    });
    if is_config {
        EXIT_CONFIG
    } else {
        1
    }
}
