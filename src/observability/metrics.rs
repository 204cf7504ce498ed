//! Metrics collection and exposition.
//!
//! # Metrics
//! - `wallet_connected` (gauge): 1 while the reconciled state is connected
//! - `wallet_tx_transitions_total` (counter): lifecycle transitions by status
//! - `wallet_tx_validation_failures_total` (counter): rejected intents by reason
//! - `wallet_refresh_total` (counter): cache refreshes by field and outcome

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Installs the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_connection(connected: bool) {
    metrics::gauge!("wallet_connected").set(if connected { 1.0 } else { 0.0 });
}

pub fn record_transition(status: &'static str) {
    metrics::counter!("wallet_tx_transitions_total", "status" => status).increment(1);
}

pub fn record_validation_failure(reason: &'static str) {
    metrics::counter!("wallet_tx_validation_failures_total", "reason" => reason).increment(1);
}

pub fn record_refresh(field: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!("wallet_refresh_total", "field" => field, "outcome" => outcome).increment(1);
}
