//! Inbound push message types and the validating decode step.
//!
//! Notification frames are discriminated by their `type` field. Chat frames
//! carry no discriminator; a frame on the chat channel is accepted only if it
//! has the `{text, sender, isAgent}` shape.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::realtime::types::ChannelKind;

/// Discriminator used to key subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Deposit,
    Withdraw,
    AutoStatus,
    Chat,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Deposit => "DEPOSIT",
            MessageKind::Withdraw => "WITHDRAW",
            MessageKind::AutoStatus => "AUTO_STATUS",
            MessageKind::Chat => "CHAT",
        }
    }
}

/// Deposit credited (or detected) for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositNotification {
    pub amount: String,
    pub token_symbol: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub network: Option<u64>,
}

/// Withdrawal progress for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawNotification {
    pub amount: String,
    pub token_symbol: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub network: Option<u64>,
    /// Backend transaction status, e.g. "PENDING", "CONFIRMED", "REJECTED".
    #[serde(default)]
    pub status: Option<String>,
}

/// Status change of an automatic deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoStatusNotification {
    pub status: String,
    /// "DP" or "WD".
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
}

/// One chat line, inbound or outbound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub text: String,
    pub sender: String,
    pub is_agent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum NotificationFrame {
    #[serde(rename = "DEPOSITNOTIFICATION")]
    Deposit(DepositNotification),
    #[serde(rename = "WITHDRAWNOTIFICATION")]
    Withdraw(WithdrawNotification),
    #[serde(rename = "AUTODEPOWDSTATUSNOTIFICATION")]
    AutoStatus(AutoStatusNotification),
}

/// A validated inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushMessage {
    Deposit(DepositNotification),
    Withdraw(WithdrawNotification),
    AutoStatus(AutoStatusNotification),
    Chat(ChatMessage),
}

impl PushMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            PushMessage::Deposit(_) => MessageKind::Deposit,
            PushMessage::Withdraw(_) => MessageKind::Withdraw,
            PushMessage::AutoStatus(_) => MessageKind::AutoStatus,
            PushMessage::Chat(_) => MessageKind::Chat,
        }
    }
}

impl From<NotificationFrame> for PushMessage {
    fn from(frame: NotificationFrame) -> Self {
        match frame {
            NotificationFrame::Deposit(n) => PushMessage::Deposit(n),
            NotificationFrame::Withdraw(n) => PushMessage::Withdraw(n),
            NotificationFrame::AutoStatus(n) => PushMessage::AutoStatus(n),
        }
    }
}

/// Why a frame was dropped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame has no `type` discriminator")]
    MissingDiscriminator,

    #[error("unknown message type '{0}'")]
    UnknownType(String),

    #[error("payload does not match the expected shape: {0}")]
    InvalidPayload(serde_json::Error),
}

impl DecodeError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            DecodeError::InvalidJson(_) => "invalid_json",
            DecodeError::NotAnObject => "not_object",
            DecodeError::MissingDiscriminator => "missing_type",
            DecodeError::UnknownType(_) => "unknown_type",
            DecodeError::InvalidPayload(_) => "invalid_payload",
        }
    }
}

const KNOWN_TYPES: [&str; 3] = [
    "DEPOSITNOTIFICATION",
    "WITHDRAWNOTIFICATION",
    "AUTODEPOWDSTATUSNOTIFICATION",
];

/// Decode a raw frame received on `channel`.
pub fn decode(channel: ChannelKind, raw: &str) -> Result<PushMessage, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(DecodeError::InvalidJson)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }

    match channel {
        ChannelKind::Chat => serde_json::from_value::<ChatMessage>(value)
            .map(PushMessage::Chat)
            .map_err(DecodeError::InvalidPayload),
        ChannelKind::Notification => {
            let kind = match value.get("type").and_then(|t| t.as_str()) {
                Some(kind) => kind.to_string(),
                None => return Err(DecodeError::MissingDiscriminator),
            };
            if !KNOWN_TYPES.contains(&kind.as_str()) {
                return Err(DecodeError::UnknownType(kind));
            }
            serde_json::from_value::<NotificationFrame>(value)
                .map(PushMessage::from)
                .map_err(DecodeError::InvalidPayload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_withdraw_notification() {
        let raw = r#"{"type":"WITHDRAWNOTIFICATION","amount":"12.5","tokenSymbol":"USDT","hash":"0xabc","status":"CONFIRMED"}"#;
        let msg = decode(ChannelKind::Notification, raw).unwrap();
        assert_eq!(msg.kind(), MessageKind::Withdraw);
        match msg {
            PushMessage::Withdraw(n) => {
                assert_eq!(n.hash.as_deref(), Some("0xabc"));
                assert_eq!(n.status.as_deref(), Some("CONFIRMED"));
                assert_eq!(n.network, None);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_decode_auto_status() {
        let raw = r#"{"type":"AUTODEPOWDSTATUSNOTIFICATION","status":"ENABLED","kind":"WD"}"#;
        let msg = decode(ChannelKind::Notification, raw).unwrap();
        assert_eq!(msg.kind(), MessageKind::AutoStatus);
    }

    #[test]
    fn test_decode_rejects_malformed_frames() {
        assert!(matches!(
            decode(ChannelKind::Notification, "not json"),
            Err(DecodeError::InvalidJson(_))
        ));
        assert!(matches!(
            decode(ChannelKind::Notification, "[1,2]"),
            Err(DecodeError::NotAnObject)
        ));
        assert!(matches!(
            decode(ChannelKind::Notification, r#"{"amount":"1"}"#),
            Err(DecodeError::MissingDiscriminator)
        ));
        assert!(matches!(
            decode(ChannelKind::Notification, r#"{"type":"BONUS"}"#),
            Err(DecodeError::UnknownType(t)) if t == "BONUS"
        ));
        // Known type, missing required fields.
        assert!(matches!(
            decode(ChannelKind::Notification, r#"{"type":"DEPOSITNOTIFICATION"}"#),
            Err(DecodeError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_decode_chat_frame() {
        let raw = r#"{"text":"hello","sender":"support","isAgent":true}"#;
        let msg = decode(ChannelKind::Chat, raw).unwrap();
        assert_eq!(
            msg,
            PushMessage::Chat(ChatMessage {
                text: "hello".into(),
                sender: "support".into(),
                is_agent: true,
            })
        );

        assert!(decode(ChannelKind::Chat, r#"{"text":"hi"}"#).is_err());
    }
}
