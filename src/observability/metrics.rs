//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_sessions_total` (counter): upgrades that reached the relay
//! - `bridge_active_sessions` (gauge): sessions currently relaying
//! - `bridge_dial_failures_total` (counter): backend dial failures by reason
//! - `bridge_relay_bytes_total` (counter): bytes relayed by direction
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus exporter only runs when enabled in config

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::websocket::relay::Direction;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_session_started() {
    metrics::counter!("bridge_sessions_total").increment(1);
    metrics::gauge!("bridge_active_sessions").increment(1.0);
}

pub fn record_session_ended() {
    metrics::gauge!("bridge_active_sessions").decrement(1.0);
}

pub fn record_dial_failure(reason: &'static str) {
    metrics::counter!("bridge_dial_failures_total", "reason" => reason).increment(1);
}

pub fn record_relay_bytes(direction: Direction, bytes: u64) {
    metrics::counter!("bridge_relay_bytes_total", "direction" => direction.as_str())
        .increment(bytes);
}
