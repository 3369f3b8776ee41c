//! Cashier REST service integration.
//!
//! # Data Flow
//! ```text
//! withdraw::orchestrator / withdraw::risk / withdraw::poller
//!     → CashierApi (trait seam)
//!     → client.rs (reqwest, JSON bodies, error body parsing)
//!     → types.rs (request/response shapes, ApiError)
//! ```
//!
//! # Design Decisions
//! - One trait for every service call so the orchestrator can run against
//!   in-memory fakes
//! - Non-2xx bodies are parsed for `{reason, message}` so callers can show the
//!   short machine-readable reason first

pub mod client;
pub mod types;

use async_trait::async_trait;
use rust_decimal::Decimal;

pub use client::HttpCashierApi;
pub use types::{
    ApiError, ManualWithdrawResponse, MinimumWithdrawalResponse, PreparedWithdrawal,
    RiskCheckRequest, RiskCheckResponse, StatusRequest, StatusResponse, WithdrawRequest,
};

/// Remote cashier service used by the withdrawal flow.
#[async_trait]
pub trait CashierApi: Send + Sync {
    async fn risk_check(&self, request: &RiskCheckRequest) -> Result<RiskCheckResponse, ApiError>;

    /// Minimum withdrawable amount for a token on a network.
    async fn minimum_withdrawal(&self, symbol: &str, network: u64) -> Result<Decimal, ApiError>;

    /// Signed payload for the on-chain `Withdraw_Web` call.
    async fn prepare_withdraw(&self, request: &WithdrawRequest) -> Result<PreparedWithdrawal, ApiError>;

    /// Route the withdrawal to manual approval. `Ok` means accepted.
    async fn manual_withdraw(&self, request: &WithdrawRequest) -> Result<(), ApiError>;

    async fn transaction_status(&self, request: &StatusRequest) -> Result<StatusResponse, ApiError>;
}
