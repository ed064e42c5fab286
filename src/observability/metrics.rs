//! Metrics collection and exposition.
//!
//! # Metrics
//! - `trustgate_submissions_total` (counter): submissions by outcome
//! - `trustgate_audit_events_total` (counter): audit entries by action
//! - `trustgate_storage_failures_total` (counter): failed store operations by op
//! - `trustgate_suspicious_events_total` (counter): suspicious DOM insertions
//! - `trustgate_active_gates` (gauge): currently mounted form gates
//!
//! Recording before `init_metrics` is a no-op, so the core stays usable in
//! tests and embedders that bring no exporter.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_submission(outcome: &'static str) {
    counter!("trustgate_submissions_total", "outcome" => outcome).increment(1);
}

pub fn record_audit_event(action: &'static str) {
    counter!("trustgate_audit_events_total", "action" => action).increment(1);
}

pub fn record_storage_failure(op: &'static str) {
    counter!("trustgate_storage_failures_total", "op" => op).increment(1);
}

pub fn record_suspicious_event() {
    counter!("trustgate_suspicious_events_total").increment(1);
}

pub fn set_active_gates(count: usize) {
    gauge!("trustgate_active_gates").set(count as f64);
}
