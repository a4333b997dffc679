//! Metrics collection and exposition.
//!
//! # Metrics
//! - `echo_requests_total` (counter): captured requests by method, status
//! - `echo_request_duration_seconds` (histogram): capture latency
//! - `echo_cache_bytes` (gauge): current blob cache size
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so subsystems call
//!   these unconditionally and only `main` decides whether to export

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one captured request.
pub fn record_request(method: &str, status: u16, started: Instant) {
    metrics::counter!(
        "echo_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    metrics::histogram!("echo_request_duration_seconds").record(started.elapsed().as_secs_f64());
}

/// Record the blob cache's current size ledger.
pub fn record_cache_size(bytes: u64) {
    metrics::gauge!("echo_cache_bytes").set(bytes as f64);
}
