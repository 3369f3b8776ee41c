//! Realtime notification subsystem.
//!
//! # Data Flow
//! ```text
//! WebSocket frame
//!     → transport.rs (pump task, TransportEvent)
//!     → connection.rs (session generation check, status tracking)
//!     → registry.rs (decode via messages.rs, fan out per MessageKind)
//!     → subscriber callbacks (withdraw orchestrator, UI, chat)
//!
//! Unexpected close:
//!     connection.rs → resilience::backoff → reconnect timer → transport.rs
//! ```
//!
//! # Design Decisions
//! - Two independent channels (notification, chat) owned by hub.rs
//! - Malformed frames are dropped and logged, never surfaced
//! - Subscriber panics are contained per callback

pub mod chat;
pub mod connection;
pub mod hub;
pub mod messages;
pub mod registry;
pub mod transport;
pub mod types;

pub use chat::ChatChannel;
pub use connection::ConnectionManager;
pub use hub::RealtimeHub;
pub use messages::{ChatMessage, MessageKind, PushMessage};
pub use registry::{EventRegistry, Subscription};
pub use transport::{Connector, TransportEvent, TransportSession, WsConnector};
pub use types::{ChannelKind, ConnectionError, ConnectionSnapshot, ConnectionStatus};
