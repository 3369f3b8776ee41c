//! Withdrawal orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! select_token / set_amount / set_destination
//!     → orchestrator.rs (WithdrawalContext, minimum fetch with cancellation)
//! execute_withdraw(profile)
//!     → validation.rs (local checks, no network)
//!     → risk.rs (RiskGate → Ok | Critical | Reserved | Error)
//!     → api::CashierApi::prepare_withdraw → blockchain::WithdrawSubmitter
//!       (or api::CashierApi::manual_withdraw → sentinel hash)
//!     → countdown.rs + poller.rs
//!     → terminal signal from poller or WITHDRAW push → Confirmed | Failed
//! ```
//!
//! # Design Decisions
//! - `Reserved` is an outcome, not an error
//! - The countdown is advisory; only terminal signals end an attempt
//! - Nothing here panics on service failures; every error becomes a state
//!   transition plus a `WithdrawEvent`

pub mod countdown;
pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod risk;
pub mod types;
pub mod validation;

pub use countdown::CountdownTimer;
pub use error::{ValidationError, WithdrawError};
pub use orchestrator::WithdrawOrchestrator;
pub use poller::{PollOutcome, StatusPoller};
pub use risk::{RiskGate, RiskVerdict};
pub use types::{
    TerminalOutcome, TokenInfo, Transaction, TransactionKind, TransactionStatus, TxHash,
    UserProfile, WithdrawEvent, WithdrawOutcome, WithdrawState, WithdrawalContext,
    MANUAL_APPROVAL_SENTINEL,
};
