//! Datastream service
//!
//! ```sh
//! # Default config (<config dir>/datastream/config.toml, defaults if absent)
//! datastream-service
//!
//! # Custom config path and port
//! datastream-service --config /etc/datastream/config.toml --port 9090
//!
//! # Validate config without starting
//! datastream-service --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use datastream::config::{default_config_path, AppConfig};
use datastream::server::{init_tracing, ServerHandle, ServerOptions};

#[derive(Parser, Debug)]
#[command(
    name = "datastream-service",
    version,
    about = "Stream event broker with HTTP and WebSocket gateways"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "DATASTREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Do not expose Prometheus metrics.
    #[arg(long)]
    no_metrics: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = AppConfig::load_or_default(&config_path)?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.validate()?;

    if cli.check {
        println!("✅ Configuration is valid");
        println!("   Config file    : {}", config_path.display());
        println!("   Listen address : {}", config.server.address());
        println!("   Queue capacity : {}", config.streaming.queue_capacity);
        println!("   Log level      : {}", config.logging.level);
        return Ok(());
    }

    init_tracing(&config);
    if config_path.exists() {
        info!("Configuration loaded from {}", config_path.display());
    } else {
        info!("No config at {}, using defaults", config_path.display());
    }

    let handle = ServerHandle::start(ServerOptions {
        config,
        enable_metrics: !cli.no_metrics,
    })
    .await?;
    handle.install_signal_handler();
    handle.wait().await;

    Ok(())
}
