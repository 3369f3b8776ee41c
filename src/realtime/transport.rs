//! Realtime transport.
//!
//! # Responsibilities
//! - Open one WebSocket per session
//! - Pump inbound frames into an event channel
//! - Forward outbound text frames; close when the sender side is dropped
//!
//! # Data Flow
//! ```text
//! ConnectionManager ── outbound (mpsc) ──→ pump task ──→ WebSocket sink
//! ConnectionManager ←── events (mpsc) ─── pump task ←── WebSocket stream
//! ```

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use crate::realtime::types::ConnectionError;

/// Something that happened on an open transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame.
    Message(String),
    /// The remote side closed the connection.
    Closed(Option<String>),
    /// The transport failed.
    Error(String),
}

/// Handles for one open transport.
///
/// Dropping `outbound` closes the transport; dropping `events` stops delivery.
pub struct TransportSession {
    pub outbound: mpsc::UnboundedSender<String>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens realtime transports.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, url: &Url) -> Result<TransportSession, ConnectionError>;
}

/// WebSocket connector backed by tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &Url) -> Result<TransportSession, ConnectionError> {
        let (stream, _response) = timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| ConnectionError::Timeout(self.connect_timeout.as_secs()))?
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;

        let (mut sink, mut source) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tracing::debug!(host = ?url.host_str(), "WebSocket transport opened");

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = outbound_rx.recv() => match outbound {
                        Some(text) => {
                            if let Err(e) = sink.send(Message::Text(text.into())).await {
                                let _ = events_tx.send(TransportEvent::Error(e.to_string()));
                                break;
                            }
                        }
                        None => {
                            // Local close.
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    },
                    inbound = source.next() => match inbound {
                        Some(Ok(Message::Text(text))) => {
                            let _ = events_tx.send(TransportEvent::Message(text.as_str().to_owned()));
                        }
                        Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                            Ok(text) => {
                                let _ = events_tx.send(TransportEvent::Message(text));
                            }
                            Err(_) => tracing::warn!("Dropping non UTF-8 binary frame"),
                        },
                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame.map(|f| f.reason.as_str().to_owned());
                            let _ = events_tx.send(TransportEvent::Closed(reason));
                            break;
                        }
                        Some(Ok(_)) => {} // ping/pong answered by tungstenite
                        Some(Err(e)) => {
                            let _ = events_tx.send(TransportEvent::Error(e.to_string()));
                            break;
                        }
                        None => {
                            let _ = events_tx.send(TransportEvent::Closed(None));
                            break;
                        }
                    },
                }
            }
            tracing::debug!("WebSocket pump stopped");
        });

        Ok(TransportSession {
            outbound: outbound_tx,
            events: events_rx,
        })
    }
}
