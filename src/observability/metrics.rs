//! Metrics collection and exposition.
//!
//! # Metrics
//! - `custody_requests_total` (counter): operations by name, chain, outcome
//! - `custody_request_duration_seconds` (histogram): operation latency
//! - `custody_broadcast_attempts_total` (counter): submission attempts by family
//! - `custody_broadcast_outcomes_total` (counter): terminal outcomes by family
//! - `custody_rpc_failures_total` (counter): failed RPC calls by family

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_request(operation: &'static str, chain: &str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(
        "custody_requests_total",
        "operation" => operation,
        "chain" => chain.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("custody_request_duration_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}

pub fn record_broadcast_attempt(family: &'static str) {
    metrics::counter!("custody_broadcast_attempts_total", "family" => family).increment(1);
}

pub fn record_broadcast_outcome(family: &'static str, outcome: &'static str) {
    metrics::counter!(
        "custody_broadcast_outcomes_total",
        "family" => family,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_rpc_failure(family: &'static str) {
    metrics::counter!("custody_rpc_failures_total", "family" => family).increment(1);
}
