//! devmon - device monitoring service entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Device monitoring service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via DEVMON_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any wss:// connection
    devmon_ws::init_crypto();

    let args = Args::parse();

    devmon_telemetry::init_logging()?;

    info!("Starting devmon v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > DEVMON_CONFIG > default
    let config_path = args
        .config
        .or_else(|| std::env::var("DEVMON_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let mut config = devmon_app::AppConfig::load(&config_path)?;
    config.apply_env();

    let app = devmon_app::Application::new(config)?;
    app.run().await?;

    Ok(())
}
