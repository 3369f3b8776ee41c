//! Withdrawal domain types.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Wire value used in place of a hash for manually approved withdrawals.
pub const MANUAL_APPROVAL_SENTINEL: &str = "manual_approval_pending";

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum WithdrawState {
    #[default]
    Idle,
    Validating,
    RiskChecking,
    Preparing,
    Submitting,
    PendingConfirmation,
    Confirmed,
    Failed,
    Reserved,
}

impl WithdrawState {
    /// Whether `execute_withdraw` may start a new attempt from this state.
    pub fn accepts_new_attempt(&self) -> bool {
        matches!(
            self,
            WithdrawState::Idle
                | WithdrawState::Reserved
                | WithdrawState::Confirmed
                | WithdrawState::Failed
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WithdrawState::Confirmed | WithdrawState::Failed | WithdrawState::Reserved
        )
    }
}

/// Hash of a submitted withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TxHash {
    OnChain(String),
    /// Routed to human approval; nothing to poll, no explorer link.
    ManualApprovalPending,
}

impl TxHash {
    /// Parse a wire value, recognising the manual-approval sentinel.
    pub fn from_wire(raw: &str) -> Self {
        if raw == MANUAL_APPROVAL_SENTINEL {
            TxHash::ManualApprovalPending
        } else {
            TxHash::OnChain(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TxHash::OnChain(hash) => hash,
            TxHash::ManualApprovalPending => MANUAL_APPROVAL_SENTINEL,
        }
    }

    pub fn on_chain(&self) -> Option<&str> {
        match self {
            TxHash::OnChain(hash) => Some(hash),
            TxHash::ManualApprovalPending => None,
        }
    }

    /// Case-insensitive match against a hash reported by the service.
    pub fn matches(&self, other: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Terminal status reported by the poller or a push message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalOutcome {
    Confirmed,
    Failed,
}

impl TerminalOutcome {
    /// `CONFIRMED` → Confirmed, `FAILED`/`REJECTED` → Failed, anything else
    /// is not terminal.
    pub fn from_status(status: &str) -> Option<Self> {
        match status.trim().to_ascii_uppercase().as_str() {
            "CONFIRMED" => Some(TerminalOutcome::Confirmed),
            "FAILED" | "REJECTED" => Some(TerminalOutcome::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalOutcome::Confirmed => "confirmed",
            TerminalOutcome::Failed => "failed",
        }
    }
}

/// A submitted withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub hash: TxHash,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub token_symbol: String,
    pub network: u64,
    pub status: TransactionStatus,
}

/// Token selected for withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub symbol: String,
    pub address: String,
    /// Chain id.
    pub network: u64,
    /// e.g. "ERC20", "BEP20", "NATIVE".
    pub token_type: String,
    #[serde(default)]
    pub withdraw_fee: Decimal,
}

/// Per-attempt user flags supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserProfile {
    pub identity: String,
    pub has_pending_withdrawal: bool,
    pub auto_withdraw_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationFlags {
    pub balance_insufficient: bool,
    pub below_minimum: bool,
    pub address_invalid: bool,
}

/// Inputs of the current attempt plus derived values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WithdrawalContext {
    pub token: Option<TokenInfo>,
    pub available_balance: Decimal,
    /// Amount exactly as entered.
    pub amount: String,
    pub destination: String,
    pub fee: Decimal,
    pub payout: Decimal,
    pub minimum: Option<Decimal>,
    pub flags: ValidationFlags,
}

impl WithdrawalContext {
    /// Recompute fee, payout and the validation flags from the inputs.
    pub fn recompute(&mut self) {
        let amount = crate::withdraw::validation::parse_amount(&self.amount).ok();
        self.fee = self
            .token
            .as_ref()
            .map(|t| t.withdraw_fee)
            .unwrap_or_default();
        self.payout = amount
            .map(|a| crate::withdraw::validation::payout(a, self.fee))
            .unwrap_or_default();

        self.flags = ValidationFlags {
            balance_insufficient: amount.is_some_and(|a| a > self.available_balance),
            below_minimum: match (amount, self.minimum) {
                (Some(a), Some(min)) => a < min,
                _ => false,
            },
            address_invalid: !self.destination.is_empty()
                && !crate::withdraw::validation::is_valid_address(&self.destination),
        };
    }
}

/// Notification emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawEvent {
    Submitted { hash: TxHash },
    Confirmed { hash: TxHash },
    Failed { hash: TxHash },
    /// Held for security review.
    Reserved,
    /// Attempt aborted before a hash was obtained.
    Rejected { reason: String },
}

/// Successful result of `execute_withdraw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawOutcome {
    Submitted(Transaction),
    Reserved,
}
