//! Chain-specific types and error definitions.

use thiserror::Error;

pub use crate::config::schema::BlockchainConfig;

/// Errors that can occur while submitting a withdrawal on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The contract call reverted.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    /// Invalid private key format or signer failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Prepared payload cannot be turned into call arguments.
    #[error("Invalid withdrawal payload: {0}")]
    InvalidPayload(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

impl BlockchainError {
    /// Short machine-readable reason for user-facing failure text.
    pub fn short_reason(&self) -> Option<&str> {
        match self {
            BlockchainError::Reverted(reason) if !reason.trim().is_empty() => Some(reason),
            BlockchainError::Timeout(_) => Some("rpc timeout"),
            BlockchainError::ChainMismatch { .. } => Some("wrong network"),
            _ => None,
        }
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;
