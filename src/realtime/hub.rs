//! Owner of the two realtime channels.

use std::sync::Arc;

use crate::config::RealtimeConfig;
use crate::realtime::chat::ChatChannel;
use crate::realtime::connection::ConnectionManager;
use crate::realtime::transport::Connector;
use crate::realtime::types::{ChannelKind, ConnectionError, ConnectionSnapshot};

/// Explicitly constructed pair of channel managers. The channels share the
/// connector but no state.
pub struct RealtimeHub {
    notifications: ConnectionManager,
    chat: ConnectionManager,
}

impl RealtimeHub {
    /// Build both channels from config. Nothing is opened yet.
    pub fn init(config: &RealtimeConfig, connector: Arc<dyn Connector>) -> Result<Self, ConnectionError> {
        let notifications =
            ConnectionManager::from_config(ChannelKind::Notification, config, connector.clone())?;
        let chat = ConnectionManager::from_config(ChannelKind::Chat, config, connector)?;
        tracing::info!("Realtime hub initialized");
        Ok(Self { notifications, chat })
    }

    pub fn channel(&self, kind: ChannelKind) -> &ConnectionManager {
        match kind {
            ChannelKind::Notification => &self.notifications,
            ChannelKind::Chat => &self.chat,
        }
    }

    pub fn notifications(&self) -> &ConnectionManager {
        &self.notifications
    }

    pub fn chat(&self) -> ChatChannel<'_> {
        ChatChannel::new(&self.chat)
    }

    pub fn connect_notifications(&self, identity: &str) {
        self.notifications.connect(identity);
    }

    pub fn connect_chat(&self, identity: &str) {
        self.chat.connect(identity);
    }

    pub fn snapshots(&self) -> [ConnectionSnapshot; 2] {
        [self.notifications.snapshot(), self.chat.snapshot()]
    }

    /// Disconnect both channels.
    pub fn shutdown(&self) {
        self.notifications.disconnect();
        self.chat.disconnect();
        tracing::info!("Realtime hub shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::transport::WsConnector;
    use crate::realtime::types::ConnectionStatus;

    #[test]
    fn test_init_rejects_bad_endpoint() {
        let mut config = RealtimeConfig::default();
        config.chat_url = "not a url".to_string();
        let result = RealtimeHub::init(&config, Arc::new(WsConnector::default()));
        assert!(matches!(result, Err(ConnectionError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn test_shutdown_leaves_both_disconnected() {
        let hub = RealtimeHub::init(&RealtimeConfig::default(), Arc::new(WsConnector::default())).unwrap();
        assert_eq!(hub.channel(ChannelKind::Chat).status(), ConnectionStatus::Idle);

        hub.shutdown();
        for snapshot in hub.snapshots() {
            assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
            assert_eq!(snapshot.reconnect_attempts, 0);
        }
    }
}
