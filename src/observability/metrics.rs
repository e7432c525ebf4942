//! Metrics collection and exposition.
//!
//! # Metrics
//! - `supervisor_sessions_started_total` (counter)
//! - `supervisor_sessions_removed_total` (counter)
//! - `supervisor_session_duration_seconds` (histogram)
//! - `supervisor_aborts_total` (counter): by termination reason
//! - `supervisor_notifications_total` (counter): by notification kind
//! - `supervisor_device_present` (gauge): 1=present, 0=absent

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_session_started() {
    metrics::counter!("supervisor_sessions_started_total").increment(1);
}

pub fn record_session_removed(duration: Duration) {
    metrics::counter!("supervisor_sessions_removed_total").increment(1);
    metrics::histogram!("supervisor_session_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_abort(reason: &'static str) {
    metrics::counter!("supervisor_aborts_total", "reason" => reason).increment(1);
}

pub fn record_notification(kind: &'static str) {
    metrics::counter!("supervisor_notifications_total", "kind" => kind).increment(1);
}

pub fn record_device_presence(present: bool) {
    metrics::gauge!("supervisor_device_present").set(if present { 1.0 } else { 0.0 });
}
