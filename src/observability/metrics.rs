//! Metrics collection and exposition.
//!
//! # Metrics
//! - `wsroute_dispatch_total` (counter): dispatch passes by outcome
//! - `wsroute_store_soft_failures_total` (counter): store misses/errors by operation
//! - `wsroute_render_failures_total` (counter): template failures
//! - `wsroute_auth_total` (counter): register/login/logout by result
//! - `wsroute_active_connections` (gauge): open WebSocket connections

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_dispatch(outcome: &'static str) {
    metrics::counter!("wsroute_dispatch_total", "outcome" => outcome).increment(1);
}

pub fn record_store_soft_failure(op: &'static str) {
    metrics::counter!("wsroute_store_soft_failures_total", "op" => op).increment(1);
}

pub fn record_render_failure() {
    metrics::counter!("wsroute_render_failures_total").increment(1);
}

pub fn record_auth(action: &'static str, result: &'static str) {
    metrics::counter!("wsroute_auth_total", "action" => action, "result" => result).increment(1);
}

pub fn set_active_connections(count: u64) {
    metrics::gauge!("wsroute_active_connections").set(count as f64);
}
