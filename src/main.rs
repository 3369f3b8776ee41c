//! Cashier realtime daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                       CASHIER                         │
//!                    │                                                       │
//!   notification ws  │  ┌────────────┐    ┌──────────┐    ┌───────────────┐  │
//!  ──────────────────┼─▶│ connection │───▶│ registry │───▶│  subscribers  │  │
//!                    │  │  manager   │    │ (by kind)│    │ (log, withdraw│  │
//!   chat ws          │  └────────────┘    └──────────┘    │  orchestrator)│  │
//!  ──────────────────┼─▶  (independent reconnect backoff)  └───────┬───────┘  │
//!                    │                                            │          │
//!                    │  ┌───────────────────────────────────────┐ ▼          │
//!   cashier REST ◀───┼──│ withdraw: risk → prepare → submit →   │            │
//!   RPC node     ◀───┼──│ poll / countdown → confirmed | failed │            │
//!                    │  └───────────────────────────────────────┘            │
//!                    └──────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `cashier [config.toml]`. The user identity comes from
//! `CASHIER_USER_ID`.

use std::path::Path;
use std::sync::Arc;

use cashier::config::{load_config, CashierConfig};
use cashier::lifecycle::{spawn_signal_listener, Shutdown};
use cashier::observability::{logging, metrics};
use cashier::realtime::{MessageKind, PushMessage, RealtimeHub, WsConnector};

const IDENTITY_ENV_VAR: &str = "CASHIER_USER_ID";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path))?,
        None => CashierConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("cashier v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let identity = std::env::var(IDENTITY_ENV_VAR)
        .map_err(|_| format!("environment variable {} not set", IDENTITY_ENV_VAR))?;

    let hub = RealtimeHub::init(&config.realtime, Arc::new(WsConnector::default()))?;
    let registry = hub.notifications().registry();
    let subscriptions = [MessageKind::Deposit, MessageKind::Withdraw, MessageKind::AutoStatus]
        .map(|kind| registry.subscribe(kind, log_push));

    tracing::info!(
        notification_url = %config.realtime.notification_url,
        identity = %identity,
        "Connecting notification channel"
    );
    hub.connect_notifications(&identity);

    let shutdown = Shutdown::new();
    let mut stop = shutdown.subscribe();
    spawn_signal_listener(shutdown);
    let _ = stop.recv().await;

    for subscription in subscriptions {
        subscription.unsubscribe();
    }
    hub.shutdown();
    tracing::info!("Shutdown complete");
    Ok(())
}

fn log_push(message: &PushMessage) {
    match message {
        PushMessage::Deposit(n) => tracing::info!(
            amount = %n.amount,
            token = %n.token_symbol,
            hash = ?n.hash,
            "Deposit notification"
        ),
        PushMessage::Withdraw(n) => tracing::info!(
            amount = %n.amount,
            token = %n.token_symbol,
            hash = ?n.hash,
            status = ?n.status,
            "Withdraw notification"
        ),
        PushMessage::AutoStatus(n) => tracing::info!(
            status = %n.status,
            kind = ?n.kind,
            hash = ?n.hash,
            "Auto deposit/withdraw status"
        ),
        PushMessage::Chat(_) => {}
    }
}
