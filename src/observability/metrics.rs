//! Metrics collection and exposition.
//!
//! # Metrics
//! - `connector_attempts_total` (counter): attempts started, by endpoint
//! - `connector_attempt_outcomes_total` (counter): current-token outcomes, by outcome
//! - `connector_stale_outcomes_total` (counter): outcomes from superseded attempts
//! - `connector_cycles_exhausted_total` (counter): full passes with no success
//! - `connector_state` (gauge): 0=closed, 1=connecting, 2=connected, 3=failed

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::connector::state::ConnectorState;
use crate::net::endpoint::Endpoint;

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_attempt_started(endpoint: &Endpoint) {
    metrics::counter!("connector_attempts_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_attempt_outcome(outcome: &'static str) {
    metrics::counter!("connector_attempt_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn record_stale_outcome() {
    metrics::counter!("connector_stale_outcomes_total").increment(1);
}

pub fn record_cycle_exhausted() {
    metrics::counter!("connector_cycles_exhausted_total").increment(1);
}

pub fn record_state(state: ConnectorState) {
    metrics::gauge!("connector_state").set(state as u8 as f64);
}
