//! Withdrawal error taxonomy.

use thiserror::Error;

use crate::api::ApiError;
use crate::blockchain::BlockchainError;

/// Local check that blocks an attempt before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("select a token")]
    NoToken,

    #[error("enter an amount")]
    EmptyAmount,

    #[error("invalid amount")]
    InvalidAmount,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("below minimum ({0})")]
    BelowMinimum(String),

    #[error("invalid address")]
    InvalidAddress,

    #[error("pending withdrawal already in progress")]
    PendingWithdrawal,
}

/// Why `execute_withdraw` did not produce a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WithdrawError {
    /// Another attempt is running; nothing changed.
    #[error("a withdrawal attempt is already in flight")]
    AttemptInFlight,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("minimum withdrawal unavailable: {0}")]
    MinimumUnavailable(ApiError),

    /// Substantive risk verdict.
    #[error("withdrawal blocked: {0}")]
    RiskCritical(String),

    /// The risk service could not give a verdict.
    #[error("risk check unavailable: {0}")]
    RiskUnavailable(String),

    #[error("withdrawal preparation failed: {0}")]
    Preparation(String),

    #[error("withdrawal submission failed: {0}")]
    Submission(String),

    /// `reset` ran while the attempt was awaiting a service.
    #[error("withdrawal attempt was cancelled")]
    Cancelled,
}

pub(crate) const GENERIC_FAILURE: &str = "withdrawal failed, please try again";

impl WithdrawError {
    /// Failure text preferring the service's short reason.
    pub(crate) fn reason_from_api(error: &ApiError) -> String {
        error
            .short_reason()
            .map(str::to_string)
            .unwrap_or_else(|| GENERIC_FAILURE.to_string())
    }

    pub(crate) fn reason_from_chain(error: &BlockchainError) -> String {
        error
            .short_reason()
            .map(str::to_string)
            .unwrap_or_else(|| GENERIC_FAILURE.to_string())
    }

    /// Label for the outcome metric.
    pub fn metric_label(&self) -> &'static str {
        match self {
            WithdrawError::AttemptInFlight => "in_flight",
            WithdrawError::Validation(_) => "validation",
            WithdrawError::MinimumUnavailable(_) => "minimum_unavailable",
            WithdrawError::RiskCritical(_) => "risk_critical",
            WithdrawError::RiskUnavailable(_) => "risk_unavailable",
            WithdrawError::Preparation(_) => "preparation",
            WithdrawError::Submission(_) => "submission",
            WithdrawError::Cancelled => "cancelled",
        }
    }
}
