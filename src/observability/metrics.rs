//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cashier_connection_status` (gauge): per channel, 1=connected, 0=otherwise
//! - `cashier_reconnect_attempts_total` (counter): scheduled reconnects per channel
//! - `cashier_push_messages_total` (counter): dispatched push messages by kind
//! - `cashier_push_dropped_total` (counter): dropped frames by reason
//! - `cashier_callback_panics_total` (counter): isolated subscriber panics
//! - `cashier_status_polls_total` (counter): status polls by result
//! - `cashier_withdraw_outcomes_total` (counter): withdrawal attempts by outcome
//!
//! Without an installed recorder every call is a no-op.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_status(channel: &'static str, connected: bool) {
    gauge!("cashier_connection_status", "channel" => channel).set(if connected { 1.0 } else { 0.0 });
}

pub fn record_reconnect_attempt(channel: &'static str) {
    counter!("cashier_reconnect_attempts_total", "channel" => channel).increment(1);
}

pub fn record_push_message(kind: &'static str) {
    counter!("cashier_push_messages_total", "kind" => kind).increment(1);
}

pub fn record_push_dropped(reason: &'static str) {
    counter!("cashier_push_dropped_total", "reason" => reason).increment(1);
}

pub fn record_callback_panic(kind: &'static str) {
    counter!("cashier_callback_panics_total", "kind" => kind).increment(1);
}

pub fn record_status_poll(result: &'static str) {
    counter!("cashier_status_polls_total", "result" => result).increment(1);
}

pub fn record_withdraw_outcome(outcome: &'static str) {
    counter!("cashier_withdraw_outcomes_total", "outcome" => outcome).increment(1);
}
