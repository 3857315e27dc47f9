//! Control Panel CLI
//!
//! Console dashboard for the ESP32 motor register backend.

use std::path::PathBuf;

use clap::Parser;
use control_panel::{load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "control-panel")]
#[command(about = "Console dashboard for the ESP32 motor register backend")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config file)
    #[arg(long)]
    backend_url: Option<String>,

    /// Polling interval in milliseconds (overrides config file)
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, backend_url={:?}, poll_interval_ms={:?}, log_level={:?}",
        args.config,
        args.backend_url,
        args.poll_interval_ms,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(backend_url) = args.backend_url {
        config.backend.base_url = backend_url;
    }
    if let Some(interval_ms) = args.poll_interval_ms {
        config.polling.interval_ms = interval_ms;
    }

    tracing::info!("Starting control panel against {}", config.backend.base_url);

    control_panel::run(config).await?;

    Ok(())
}
