use anyhow::{Context, Result};
use clap::Parser;
use jobcast::cli::{handle_command, write_default_config, Cli, Command};
use jobcast::core::ConfigManager;
use std::fs::OpenOptions;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Command::Init) && write_default_config(&cli.config).await? {
        println!("📝 Wrote starter configuration to {}", cli.config.display());
    }

    let manager = ConfigManager::load(&cli.config)?;
    manager.ensure_directories().await?;

    let log_path = manager.log_file_path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let default_filter = format!("jobcast={}", manager.config.logging.level);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    manager.log_loaded();

    handle_command(cli, manager).await
}
