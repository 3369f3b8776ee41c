//! Support chat over the chat channel.

use crate::realtime::connection::ConnectionManager;
use crate::realtime::messages::{ChatMessage, MessageKind, PushMessage};
use crate::realtime::registry::Subscription;
use crate::realtime::types::ConnectionError;

/// Typed view of the chat channel.
pub struct ChatChannel<'a> {
    manager: &'a ConnectionManager,
}

impl<'a> ChatChannel<'a> {
    pub fn new(manager: &'a ConnectionManager) -> Self {
        Self { manager }
    }

    /// Send one chat line. Rejected client-side unless connected.
    pub fn send(&self, message: &ChatMessage) -> Result<(), ConnectionError> {
        let payload = serde_json::to_string(message)?;
        self.manager.send_text(payload)
    }

    /// Register a callback for inbound chat lines.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChatMessage) + Send + Sync + 'static,
    {
        self.manager.registry().subscribe(MessageKind::Chat, move |message| {
            if let PushMessage::Chat(chat) = message {
                callback(chat);
            }
        })
    }
}
