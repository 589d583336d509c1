//! WebSocket bridge (v1)
//!
//! Accepts WebSocket upgrades and bridges each one to a single upstream.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                  WS BRIDGE                    │
//!     Client upgrade     │  ┌─────────┐   ┌───────────┐   ┌──────────┐  │
//!     ───────────────────┼─▶│  http   │──▶│ connector │──▶│  dialer  │──┼──▶ Backend
//!                        │  │ server  │   │ (headers, │   │ (HTTP/1.1│  │
//!     101 + accept       │  └────┬────┘   │  scheme)  │   │ upgrade) │  │
//!     ◀──────────────────┼───────┘        └───────────┘   └──────────┘  │
//!                        │                                              │
//!     raw bytes          │  ┌──────────────────────────────────────┐   │
//!     ◀─────────────────▶┼─▶│        relay (two copy tasks)        │◀──┼──▶ raw bytes
//!                        │  └──────────────────────────────────────┘   │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ws_bridge::config::{load_config, validation::validate_config, BridgeConfig, ConfigError};
use ws_bridge::lifecycle::signals::spawn_signal_handler;
use ws_bridge::observability::{logging, metrics};
use ws_bridge::{BridgeServer, Shutdown};

#[derive(Parser)]
#[command(name = "ws-bridge")]
#[command(
    about = "Bridge WebSocket upgrades to a backend and relay the session",
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    listen: Option<String>,

    /// Override upstream.url.
    #[arg(short, long)]
    upstream: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(listen) = cli.listen {
        config.listener.bind_address = listen;
    }
    if let Some(upstream) = cli.upstream {
        config.upstream.url = upstream;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability);

    tracing::info!("ws-bridge v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        preserve_host = config.upstream.preserve_host,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    spawn_signal_handler(&shutdown);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = BridgeServer::new(config, shutdown)?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
