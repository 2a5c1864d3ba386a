use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sbsync::config::LogLevel;
use sbsync::Settings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Sync SwitchBot cloud device names into Home Assistant and register
/// discovered SwitchBot devices.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Settings file (TOML); built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON options file holding switchbot_token and switchbot_secret
    #[arg(long)]
    options: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    if let Some(options) = args.options {
        settings.paths.options = options;
    }
    if let Some(level) = args.log_level {
        settings.logging.level = level;
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(settings.logging.filter())
        .init();

    tracing::info!("==================================================");
    tracing::info!("SwitchBot name sync v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("==================================================");

    let report = sbsync::sync::run(&settings).await.context("Sync aborted")?;

    tracing::info!(
        "All done: {} cloud devices, {} registry devices, {} renamed, {} registered",
        report.directory_size,
        report.registry_size,
        report.synced,
        report.registered
    );

    Ok(())
}
