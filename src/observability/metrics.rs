//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, latency, cache errors, retries)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `cache_proxy_requests_total` (counter): requests by method, status, cache
//! - `cache_proxy_request_duration_seconds` (histogram): latency by cache outcome
//! - `cache_proxy_upstream_retries_total` (counter): retried upstream round trips
//! - `cache_proxy_cache_errors_total` (counter): store failures by operation
//! - `cache_proxy_cache_writes_dropped_total` (counter): writes lost to a full queue
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels for method, status code, cache outcome

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, cache: &'static str, elapsed: Duration) {
    metrics::counter!(
        "cache_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "cache" => cache
    )
    .increment(1);
    metrics::histogram!("cache_proxy_request_duration_seconds", "cache" => cache)
        .record(elapsed.as_secs_f64());
}

pub fn record_upstream_retry() {
    metrics::counter!("cache_proxy_upstream_retries_total").increment(1);
}

pub fn record_cache_error(op: &'static str) {
    metrics::counter!("cache_proxy_cache_errors_total", "op" => op).increment(1);
}

pub fn record_write_dropped() {
    metrics::counter!("cache_proxy_cache_writes_dropped_total").increment(1);
}
