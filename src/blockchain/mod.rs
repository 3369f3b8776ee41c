//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key)
//!     → wallet.rs (key loading, chain-bound signer)
//!     → submitter.rs (amount scaling, Withdraw_Web call with timeout)
//!     → transaction hash handed back to withdraw::orchestrator
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod submitter;
pub mod types;
pub mod wallet;

pub use submitter::{scale_amount, ContractSubmitter, WithdrawSubmitter};
pub use types::{BlockchainConfig, BlockchainError, BlockchainResult};
pub use wallet::Wallet;
