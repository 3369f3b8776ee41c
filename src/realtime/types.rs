//! Channel identifiers, connection status and error definitions.

use thiserror::Error;

/// One independent logical realtime connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Deposit / withdraw / auto-status notifications.
    Notification,
    /// Support chat.
    Chat,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Notification => "notification",
            ChannelKind::Chat => "chat",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection status of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
    Error,
}

impl ConnectionStatus {
    /// True while a transport is open or being (re)opened. `connect` is a
    /// no-op in these states.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connecting | ConnectionStatus::Connected | ConnectionStatus::Reconnecting
        )
    }
}

/// Point-in-time view of a channel's connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub channel: ChannelKind,
    pub status: ConnectionStatus,
    pub reconnect_attempts: u32,
    pub last_identity: Option<String>,
}

/// Errors raised by the realtime layer.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Sending requires a connected channel; nothing is queued.
    #[error("{channel} channel is not connected (status: {status:?})")]
    NotConnected {
        channel: ChannelKind,
        status: ConnectionStatus,
    },

    /// The transport refused, dropped or failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Opening the transport took too long.
    #[error("connect timed out after {0} seconds")]
    Timeout(u64),

    /// Endpoint URL could not be parsed.
    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    /// Outbound payload could not be serialized.
    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] serde_json::Error),
}
