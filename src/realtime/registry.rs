//! Event subscription registry.
//!
//! # Responsibilities
//! - Keep independent callback sets per `MessageKind`
//! - Decode raw frames and fan them out to the matching set
//! - Isolate callbacks: a panicking subscriber never stops the others
//!
//! Callbacks are snapshotted before they run, so a callback may subscribe or
//! unsubscribe without deadlocking the registry.

use dashmap::DashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use uuid::Uuid;

use crate::observability::metrics;
use crate::realtime::messages::{decode, MessageKind, PushMessage};
use crate::realtime::types::ChannelKind;

/// Subscriber callback.
pub type Callback = Arc<dyn Fn(&PushMessage) + Send + Sync>;

struct Entry {
    id: Uuid,
    callback: Callback,
}

/// Registry of push message subscribers.
#[derive(Default)]
pub struct EventRegistry {
    subscribers: DashMap<MessageKind, Vec<Entry>>,
}

/// Capability to remove exactly one registered callback.
///
/// Dropping the handle keeps the callback registered.
#[must_use = "dropping a Subscription leaves the callback registered; call unsubscribe() to remove it"]
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    kind: MessageKind,
    registry: Weak<EventRegistry>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Remove the callback. Returns false if it was already gone (or the
    /// registry no longer exists).
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.kind, self.id),
            None => false,
        }
    }
}

impl EventRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `callback` for messages of `kind`.
    pub fn subscribe<F>(self: &Arc<Self>, kind: MessageKind, callback: F) -> Subscription
    where
        F: Fn(&PushMessage) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.subscribers.entry(kind).or_default().push(Entry {
            id,
            callback: Arc::new(callback),
        });
        tracing::debug!(kind = kind.as_str(), subscription = %id, "Subscriber registered");

        Subscription {
            id,
            kind,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, kind: MessageKind, id: Uuid) -> bool {
        let Some(mut entries) = self.subscribers.get_mut(&kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() != before;
        if removed {
            tracing::debug!(kind = kind.as_str(), subscription = %id, "Subscriber removed");
        }
        removed
    }

    /// Number of callbacks currently registered for `kind`.
    pub fn subscriber_count(&self, kind: MessageKind) -> usize {
        self.subscribers.get(&kind).map(|e| e.len()).unwrap_or(0)
    }

    /// Deliver a validated message. Returns how many callbacks completed
    /// without panicking.
    pub fn dispatch(&self, message: &PushMessage) -> usize {
        let kind = message.kind();
        let callbacks: Vec<(Uuid, Callback)> = match self.subscribers.get(&kind) {
            Some(entries) => entries.iter().map(|e| (e.id, e.callback.clone())).collect(),
            None => Vec::new(),
        };

        metrics::record_push_message(kind.as_str());

        let mut delivered = 0;
        for (id, callback) in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(message))) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    metrics::record_callback_panic(kind.as_str());
                    tracing::warn!(
                        kind = kind.as_str(),
                        subscription = %id,
                        "Subscriber panicked; continuing dispatch"
                    );
                }
            }
        }
        delivered
    }

    /// Decode a raw frame from `channel` and dispatch it. Malformed frames
    /// are logged and dropped.
    pub fn dispatch_raw(&self, channel: ChannelKind, raw: &str) -> usize {
        match decode(channel, raw) {
            Ok(message) => self.dispatch(&message),
            Err(e) => {
                metrics::record_push_dropped(e.reason());
                tracing::warn!(channel = %channel, error = %e, "Dropping malformed push message");
                0
            }
        }
    }
}
