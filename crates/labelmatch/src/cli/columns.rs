//! The `labelmatch columns` command.

use clap::Args;
use labelmatch_core::{Config, DataSource};
use std::path::PathBuf;

/// Arguments for the `columns` command.
#[derive(Args, Debug, Default)]
pub struct ColumnsArgs {
    /// CSV or XLSX data source (overrides general.data_file)
    #[arg(long)]
    pub data: Option<PathBuf>,
}

/// Print the header columns of the data source, one per line.
pub async fn execute(args: ColumnsArgs, config: Config) -> anyhow::Result<()> {
    let path = match args.data {
        Some(path) => path,
        None => config.data_file(),
    };

    let source = DataSource::load(&path)?;
    tracing::info!(
        "{} has {} columns and {} rows",
        path.display(),
        source.columns().len(),
        source.rows().len()
    );
    for column in source.columns() {
        println!("{column}");
    }
    Ok(())
}
