//! Cashier service request/response types and error definitions.

use alloy::primitives::{Address, Bytes};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of the risk check call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCheckRequest {
    pub identity: String,
    pub amount: String,
}

/// Risk service verdict, e.g. `{"status":"reserved"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCheckResponse {
    pub status: String,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimumWithdrawalResponse {
    pub minimum: Decimal,
}

/// Body shared by the prepare and manual withdrawal calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub identity: String,
    pub destination_address: String,
    pub token_address: String,
    pub amount: String,
    pub network: u64,
    pub token_type: String,
}

/// Signed payload for the `Withdraw_Web` contract call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedWithdrawal {
    pub contract_address: Address,
    pub token_address: Address,
    pub transaction_id: String,
    pub encoded_data: Bytes,
    pub expiry: u64,
    pub signature: Bytes,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualWithdrawResponse {
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Status lookup; `kind` is "WD" for withdrawals and "DP" for deposits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequest {
    pub kind: String,
    pub hash: String,
    pub identity: String,
}

impl StatusRequest {
    pub fn withdraw(hash: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            kind: "WD".to_string(),
            hash: hash.into(),
            identity: identity.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub transaction_status: String,
}

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Errors from the cashier service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Request never produced a response (DNS, refused, timeout).
    #[error("service unreachable: {0}")]
    Unreachable(String),

    /// Non-2xx response.
    #[error("service returned {status}: {}", detail(.message, .reason))]
    Status {
        status: u16,
        reason: Option<String>,
        message: Option<String>,
    },

    /// 2xx response whose body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The service declined the request (e.g. manual withdrawal refused).
    #[error("request rejected: {}", detail(&None, .reason))]
    Rejected { reason: Option<String> },
}

fn detail<'a>(message: &'a Option<String>, reason: &'a Option<String>) -> &'a str {
    message
        .as_deref()
        .or(reason.as_deref())
        .unwrap_or("no details")
}

impl ApiError {
    /// Short machine-readable reason, when the service sent one.
    pub fn short_reason(&self) -> Option<&str> {
        match self {
            ApiError::Status { reason, .. } | ApiError::Rejected { reason } => {
                reason.as_deref().filter(|r| !r.trim().is_empty())
            }
            _ => None,
        }
    }
}
