//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated config into a ready ProxyHandler
//! - Start the metrics endpoint when enabled
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Transport is chosen here; the handler never knows which one it got

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::config::{ProxyConfig, TransportKind};
use crate::observability::metrics;
use crate::proxy::{HyperTransport, ProxyHandler, ReqwestTransport, TransportError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build transport: {0}")]
    Transport(#[from] TransportError),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the forwarding handler described by `config`.
pub fn build_handler(config: &ProxyConfig) -> Result<ProxyHandler, StartupError> {
    let connect = Some(Duration::from_secs(config.timeouts.connect_secs));
    let upstream = Some(Duration::from_secs(config.timeouts.upstream_secs));

    let builder = ProxyHandler::builder(config.upstream.base_url.clone())
        .forward_query(config.upstream.forward_query)
        .max_response_bytes(config.upstream.max_response_bytes);

    let builder = match config.upstream.transport {
        TransportKind::Hyper => builder.transport(HyperTransport::with_timeouts(connect, upstream)),
        TransportKind::Reqwest => {
            builder.transport(ReqwestTransport::with_timeouts(connect, upstream)?)
        }
    };

    let handler = builder.build();
    tracing::info!(
        base_url = %handler.base_url(),
        transport = ?config.upstream.transport,
        forward_query = config.upstream.forward_query,
        "Proxy handler ready"
    );
    Ok(handler)
}

/// Start the Prometheus endpoint if enabled.
pub fn start_metrics(config: &ProxyConfig) -> Result<(), StartupError> {
    if !config.observability.metrics_enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .observability
        .metrics_address
        .parse()
        .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
    metrics::init_metrics(addr)?;
    Ok(())
}
