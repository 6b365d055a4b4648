//! Metrics collection and exposition.
//!
//! # Metrics
//! - `failover_probe_total` (counter): probes by instance, result
//! - `failover_transitions_total` (counter): state-machine transitions by kind
//! - `failover_alerts_total` (counter): critical alerts by kind
//! - `failover_store_errors_total` (counter): failed store commands by op
//! - `failover_directive_failures_total` (counter): failed directives by directive
//! - `failover_consecutive_failures` (gauge): current failure count
//! - `failover_current_primary` (gauge): 0=primary, 1=secondary

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::cluster::InstanceRole;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_probe(instance: &'static str, healthy: bool) {
    let result = if healthy { "healthy" } else { "unhealthy" };
    counter!("failover_probe_total", "instance" => instance, "result" => result).increment(1);
}

pub fn record_transition(kind: &'static str) {
    counter!("failover_transitions_total", "kind" => kind).increment(1);
}

pub fn record_alert(kind: &'static str) {
    counter!("failover_alerts_total", "kind" => kind).increment(1);
}

pub fn record_store_error(op: &'static str) {
    counter!("failover_store_errors_total", "op" => op).increment(1);
}

pub fn record_directive_failure(directive: &'static str) {
    counter!("failover_directive_failures_total", "directive" => directive).increment(1);
}

pub fn record_monitor_state(current_primary: InstanceRole, consecutive_failures: u32) {
    gauge!("failover_consecutive_failures").set(consecutive_failures as f64);
    let primary = match current_primary {
        InstanceRole::Primary => 0.0,
        InstanceRole::Secondary => 1.0,
    };
    gauge!("failover_current_primary").set(primary);
}
