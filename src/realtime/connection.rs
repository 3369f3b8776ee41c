//! Connection lifecycle for one realtime channel.
//!
//! # State Transitions
//! ```text
//! Idle/Disconnected/Error ──connect──→ Connecting ──open ok──→ Connected
//! Connecting/Connected ──error──→ Error ──→ (unexpected close path)
//! unexpected close, attempts < max ──→ Reconnecting ──timer──→ Connecting
//! unexpected close, attempts = max ──→ Disconnected (explicit connect needed)
//! any ──disconnect──→ Disconnected (timer cancelled, attempts cleared)
//! ```
//!
//! Every opened session is tagged with a generation. `disconnect` and a new
//! `connect` bump the generation, so events from a torn-down session are
//! ignored even if they are already queued.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::config::RealtimeConfig;
use crate::observability::metrics;
use crate::realtime::registry::EventRegistry;
use crate::realtime::transport::{Connector, TransportEvent, TransportSession};
use crate::realtime::types::{ChannelKind, ConnectionError, ConnectionSnapshot, ConnectionStatus};
use crate::resilience::LinearBackoff;

#[derive(Default)]
struct Slot {
    status: ConnectionStatus,
    reconnect_attempts: u32,
    last_identity: Option<String>,
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    session_task: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
}

struct Inner {
    channel: ChannelKind,
    endpoint: Url,
    service_key: String,
    backoff: LinearBackoff,
    connector: Arc<dyn Connector>,
    registry: Arc<EventRegistry>,
    slot: Mutex<Slot>,
}

/// Owns the transport of one channel. Must be used inside a Tokio runtime.
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(
        channel: ChannelKind,
        endpoint: Url,
        service_key: impl Into<String>,
        backoff: LinearBackoff,
        connector: Arc<dyn Connector>,
        registry: Arc<EventRegistry>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                channel,
                endpoint,
                service_key: service_key.into(),
                backoff,
                connector,
                registry,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    /// Build the manager for `channel` from the realtime config section.
    pub fn from_config(
        channel: ChannelKind,
        config: &RealtimeConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ConnectionError> {
        let raw = match channel {
            ChannelKind::Notification => &config.notification_url,
            ChannelKind::Chat => &config.chat_url,
        };
        let endpoint = Url::parse(raw).map_err(|_| ConnectionError::InvalidEndpoint(raw.clone()))?;
        let backoff = LinearBackoff::new(
            std::time::Duration::from_millis(config.reconnect_base_delay_ms),
            config.max_reconnect_attempts,
        );
        Ok(Self::new(
            channel,
            endpoint,
            config.service_key.clone(),
            backoff,
            connector,
            EventRegistry::new(),
        ))
    }

    pub fn channel(&self) -> ChannelKind {
        self.inner.channel
    }

    /// Subscribers for messages arriving on this channel.
    pub fn registry(&self) -> &Arc<EventRegistry> {
        &self.inner.registry
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.lock().status
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        let slot = self.inner.lock();
        ConnectionSnapshot {
            channel: self.inner.channel,
            status: slot.status,
            reconnect_attempts: slot.reconnect_attempts,
            last_identity: slot.last_identity.clone(),
        }
    }

    /// Open the channel for `identity`. No-op while connecting, connected
    /// or reconnecting. Starts a fresh reconnect budget.
    pub fn connect(&self, identity: &str) {
        let mut slot = self.inner.lock();
        if slot.status.is_active() {
            tracing::debug!(
                channel = %self.inner.channel,
                status = ?slot.status,
                "connect ignored; channel already active"
            );
            return;
        }

        Inner::teardown(&mut slot);
        slot.reconnect_attempts = 0;
        slot.last_identity = Some(identity.to_string());
        slot.status = ConnectionStatus::Connecting;
        self.inner.open_session(&mut slot, identity);
    }

    /// Close the channel without triggering reconnection.
    pub fn disconnect(&self) {
        let mut slot = self.inner.lock();
        Inner::teardown(&mut slot);
        slot.reconnect_attempts = 0;
        slot.status = ConnectionStatus::Disconnected;
        metrics::record_connection_status(self.inner.channel.as_str(), false);
        tracing::info!(channel = %self.inner.channel, "Channel disconnected");
    }

    /// Send a text frame. Rejected unless the channel is `Connected`.
    pub fn send_text(&self, text: String) -> Result<(), ConnectionError> {
        let slot = self.inner.lock();
        let not_connected = || ConnectionError::NotConnected {
            channel: self.inner.channel,
            status: slot.status,
        };
        if slot.status != ConnectionStatus::Connected {
            return Err(not_connected());
        }
        let outbound = slot.outbound.as_ref().ok_or_else(not_connected)?;
        outbound
            .send(text)
            .map_err(|_| ConnectionError::Transport("transport closed".to_string()))
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let mut slot = self.inner.lock();
        Inner::teardown(&mut slot);
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel the reconnect timer, detach the session and close the transport.
    fn teardown(slot: &mut Slot) {
        slot.generation += 1;
        if let Some(timer) = slot.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(task) = slot.session_task.take() {
            task.abort();
        }
        // Dropping the sender closes the transport.
        slot.outbound = None;
    }

    fn session_url(&self, identity: &str) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("serviceKey", &self.service_key);
            if self.channel == ChannelKind::Notification {
                query.append_pair("userId", identity);
            }
        }
        url
    }

    fn open_session(self: &Arc<Self>, slot: &mut Slot, identity: &str) {
        slot.generation += 1;
        let generation = slot.generation;
        if let Some(task) = slot.session_task.take() {
            task.abort();
        }

        let url = self.session_url(identity);
        let inner = Arc::clone(self);
        slot.session_task = Some(tokio::spawn(async move {
            inner.run_session(generation, url).await;
        }));
    }

    async fn run_session(self: Arc<Self>, generation: u64, url: Url) {
        let TransportSession { outbound, mut events } = match self.connector.open(&url).await {
            Ok(session) => session,
            Err(e) => {
                self.on_transport_error(generation, &e.to_string());
                return;
            }
        };

        if !self.on_open(generation, outbound) {
            return;
        }

        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Message(raw) => {
                    if !self.is_current(generation) {
                        return;
                    }
                    self.registry.dispatch_raw(self.channel, &raw);
                }
                TransportEvent::Closed(reason) => {
                    self.on_unexpected_close(generation, reason.as_deref());
                    return;
                }
                TransportEvent::Error(e) => {
                    self.on_transport_error(generation, &e);
                    return;
                }
            }
        }
        self.on_unexpected_close(generation, None);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    fn on_open(&self, generation: u64, outbound: mpsc::UnboundedSender<String>) -> bool {
        let mut slot = self.lock();
        if slot.generation != generation {
            return false;
        }
        slot.status = ConnectionStatus::Connected;
        slot.reconnect_attempts = 0;
        if let Some(timer) = slot.reconnect_timer.take() {
            timer.abort();
        }
        slot.outbound = Some(outbound);
        metrics::record_connection_status(self.channel.as_str(), true);
        tracing::info!(channel = %self.channel, "Channel connected");
        true
    }

    fn on_transport_error(self: &Arc<Self>, generation: u64, error: &str) {
        let mut slot = self.lock();
        if slot.generation != generation {
            return;
        }
        slot.status = ConnectionStatus::Error;
        tracing::warn!(channel = %self.channel, error = %error, "Transport error");
        self.handle_close(&mut slot);
    }

    fn on_unexpected_close(self: &Arc<Self>, generation: u64, reason: Option<&str>) {
        let mut slot = self.lock();
        if slot.generation != generation {
            return;
        }
        tracing::warn!(channel = %self.channel, reason = ?reason, "Channel closed unexpectedly");
        self.handle_close(&mut slot);
    }

    fn handle_close(self: &Arc<Self>, slot: &mut Slot) {
        slot.outbound = None;
        metrics::record_connection_status(self.channel.as_str(), false);

        let attempt = slot.reconnect_attempts + 1;
        let Some(delay) = self.backoff.delay_for(attempt) else {
            slot.status = ConnectionStatus::Disconnected;
            tracing::error!(
                channel = %self.channel,
                attempts = slot.reconnect_attempts,
                "Reconnect attempts exhausted; waiting for explicit connect"
            );
            return;
        };

        slot.reconnect_attempts = attempt;
        slot.status = ConnectionStatus::Reconnecting;
        metrics::record_reconnect_attempt(self.channel.as_str());
        tracing::info!(
            channel = %self.channel,
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );

        let generation = slot.generation;
        let inner = Arc::clone(self);
        if let Some(old) = slot.reconnect_timer.take() {
            old.abort();
        }
        slot.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.fire_reconnect(generation);
        }));
    }

    fn fire_reconnect(self: &Arc<Self>, generation: u64) {
        let mut slot = self.lock();
        if slot.generation != generation || slot.status != ConnectionStatus::Reconnecting {
            return;
        }
        let Some(identity) = slot.last_identity.clone() else {
            slot.status = ConnectionStatus::Disconnected;
            return;
        };
        slot.status = ConnectionStatus::Connecting;
        self.open_session(&mut slot, &identity);
    }
}
