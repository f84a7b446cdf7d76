//! Crossroads CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use crossroads_cli::app;
use crossroads_cli::cli::Cli;
use crossroads_cli::config::Config;
use crossroads_cli::error::AppError;
use crossroads_core::clock::SystemClock;
use crossroads_store::file_blob_store::FileBlobStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing subscriber. Logs go to stderr so stdout stays clean
    // for command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "command failed");
            eprintln!("crossroads: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn execute(cli: Cli) -> Result<(), AppError> {
    let config = Config::from_env()?.with_data_dir(cli.data_dir);
    tracing::debug!(data_dir = %config.data_dir.display(), "configuration loaded");

    let store = FileBlobStore::new(config.data_dir);
    let mut stdout = std::io::stdout().lock();
    app::run(cli.command, &store, &SystemClock, &mut stdout).await
}
