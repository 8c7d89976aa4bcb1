//! Metrics collection and exposition.
//!
//! # Metrics
//! - `jsonapi_proxy_forwarded_total` (counter): completed forwards by operation, status
//! - `jsonapi_proxy_forward_duration_seconds` (histogram): forward latency by operation
//! - `jsonapi_proxy_forward_failures_total` (counter): failed forwards by operation, stage

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

use crate::jsonapi::OperationKind;

pub const FORWARDED_TOTAL: &str = "jsonapi_proxy_forwarded_total";
pub const FORWARD_DURATION_SECONDS: &str = "jsonapi_proxy_forward_duration_seconds";
pub const FORWARD_FAILURES_TOTAL: &str = "jsonapi_proxy_forward_failures_total";

/// Install the Prometheus recorder and its scrape listener.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a forward that produced a backend response.
pub fn record_forward(operation: OperationKind, status: u16, start: Instant) {
    counter!(
        FORWARDED_TOTAL,
        "operation" => operation.as_str(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(FORWARD_DURATION_SECONDS, "operation" => operation.as_str())
        .record(start.elapsed().as_secs_f64());
}

/// Record a forward that failed at `stage`.
pub fn record_failure(operation: OperationKind, stage: &'static str, start: Instant) {
    counter!(
        FORWARD_FAILURES_TOTAL,
        "operation" => operation.as_str(),
        "stage" => stage
    )
    .increment(1);

    histogram!(FORWARD_DURATION_SECONDS, "operation" => operation.as_str())
        .record(start.elapsed().as_secs_f64());
}
