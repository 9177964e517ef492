//! Metrics collection and exposition.
//!
//! # Metrics
//! - `haproxy_synth_cycles_total` (counter): cycles by outcome
//! - `haproxy_synth_reloads_total` (counter): successful reloads
//! - `haproxy_synth_reload_failures_total` (counter)
//! - `haproxy_synth_write_failures_total` (counter)
//! - `haproxy_synth_config_bytes` (gauge): size of the last rendered config

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`. Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_cycle(outcome: &'static str) {
    metrics::counter!("haproxy_synth_cycles_total", "outcome" => outcome).increment(1);
}

pub fn record_reload(success: bool) {
    if success {
        metrics::counter!("haproxy_synth_reloads_total").increment(1);
    } else {
        metrics::counter!("haproxy_synth_reload_failures_total").increment(1);
    }
}

pub fn record_write_failure() {
    metrics::counter!("haproxy_synth_write_failures_total").increment(1);
}

pub fn record_config_bytes(bytes: usize) {
    metrics::gauge!("haproxy_synth_config_bytes").set(bytes as f64);
}
