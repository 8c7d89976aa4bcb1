//! JSON:API forwarding proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────────┐
//!                      │                 JSONAPI PROXY                     │
//!                      │                                                   │
//!   Client Request     │  ┌─────────┐    ┌────────────┐    ┌────────────┐  │
//!   ───────────────────┼─▶│  http   │───▶│  routing   │───▶│   proxy    │  │
//!                      │  │ server  │    │ classifier │    │  resolver  │  │
//!                      │  └─────────┘    └────────────┘    └─────┬──────┘  │
//!                      │                                        │         │
//!                      │                                        ▼         │
//!   Client Response    │  ┌──────────┐    ┌────────────┐   ┌────────────┐  │
//!   ◀──────────────────┼──│ jsonapi  │◀───│   proxy    │◀──│ transport  │◀─┼── Backend
//!                      │  │ response │    │  handler   │   │            │  │
//!                      │  └──────────┘    └────────────┘   └────────────┘  │
//!                      │                                                   │
//!                      │   config · observability · lifecycle             │
//!                      └───────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use jsonapi_proxy::config::{self, ProxyConfig};
use jsonapi_proxy::lifecycle::{startup, Shutdown};
use jsonapi_proxy::observability::logging;
use jsonapi_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "jsonapi-proxy")]
#[command(about = "Forward JSON:API requests to a backend server", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override upstream.base_url.
    #[arg(long)]
    base_url: Option<String>,

    /// Override listener.bind_address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(base_url) = cli.base_url {
        config.upstream.base_url = base_url;
    }
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    config::validation::validate_config(&config).map_err(config::ConfigError::Validation)?;

    logging::init(&config.observability);
    tracing::info!("jsonapi-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_url = %config.upstream.base_url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    startup::start_metrics(&config)?;
    let handler = startup::build_handler(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let _signals = shutdown.trigger_on_signal();

    let server = HttpServer::new(config, handler);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
