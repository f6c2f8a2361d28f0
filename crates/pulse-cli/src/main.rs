mod check;
mod publish;
mod show;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pulse-cli")]
#[command(about = "Brand pulse command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate environment and tracking configuration, then exit
    CheckConfig {
        /// Tracking file to validate instead of `PULSE_TRACKING_PATH`
        #[arg(long)]
        tracking: Option<PathBuf>,
    },
    /// Run one collection cycle per enabled source and publish a snapshot
    PublishOnce {
        /// Aggregate and print the result without writing the snapshot file
        #[arg(long)]
        dry_run: bool,
    },
    /// Read, validate, and print the current snapshot file
    Show {
        /// Snapshot file to read instead of `PULSE_SNAPSHOT_PATH`
        #[arg(long)]
        path: Option<PathBuf>,

        /// Print the raw JSON document instead of a summary
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = pulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::CheckConfig { tracking } => check::run_check_config(&config, tracking.as_deref()),
        Commands::PublishOnce { dry_run } => publish::run_publish_once(&config, dry_run).await,
        Commands::Show { path, json } => show::run_show(&config, path.as_deref(), json).await,
    }
}

#[cfg(test)]
mod tests;
