//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, route, status
//! - `gateway_request_duration_seconds` (histogram): latency by method, route
//! - `gateway_registry_lookups_total` (counter): by registry and outcome
//!   (`hit`, `joined`, `created`, `failed`)
//! - `gateway_registry_entries` (gauge): published entries per registry
//!
//! Recording is a no-op until a recorder is installed.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| e.to_string())?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished HTTP request.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record how a registry lookup was satisfied.
pub fn record_registry_lookup(registry: &'static str, outcome: &'static str) {
    counter!("gateway_registry_lookups_total", "registry" => registry, "outcome" => outcome)
        .increment(1);
}

/// Record the number of published entries in a registry.
pub fn record_registry_size(registry: &'static str, size: usize) {
    gauge!("gateway_registry_entries", "registry" => registry).set(size as f64);
}
