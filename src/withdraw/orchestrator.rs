//! Withdrawal state machine.
//!
//! # State Transitions
//! ```text
//! Idle ──execute──→ Validating ──→ RiskChecking ──ok──→ Preparing → Submitting ──hash──→ PendingConfirmation
//!                       │               │                   (manual: Submitting only)          │
//!                       │               ├──reserved──→ Reserved                                ├──CONFIRMED──→ Confirmed
//!                       └── failure ────┴──critical/error──→ Idle                              └──FAILED/REJECTED──→ Failed
//! any ──reset──→ Idle
//! ```
//!
//! # Design Decisions
//! - All mutable state sits behind one `std::sync::Mutex`, never held across
//!   an `.await`
//! - Each attempt carries an epoch; `reset` bumps it and every step re-checks
//!   it after awaiting, so a stale attempt ends in `Cancelled`
//! - Minimum fetches carry a `CancellationToken`; selecting another token
//!   cancels the previous one and its result is discarded
//! - Poller and push notifications race; the first terminal signal for the
//!   current hash wins and later ones are no-ops

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::api::{CashierApi, WithdrawRequest};
use crate::blockchain::WithdrawSubmitter;
use crate::config::{ExplorerConfig, WithdrawConfig};
use crate::observability::metrics;
use crate::realtime::{EventRegistry, MessageKind, PushMessage, Subscription};
use crate::withdraw::countdown::CountdownTimer;
use crate::withdraw::error::{ValidationError, WithdrawError, GENERIC_FAILURE};
use crate::withdraw::poller::{PollOutcome, StatusPoller};
use crate::withdraw::risk::{RiskGate, RiskVerdict};
use crate::withdraw::types::{
    TerminalOutcome, TokenInfo, Transaction, TransactionKind, TransactionStatus, TxHash,
    UserProfile, WithdrawEvent, WithdrawOutcome, WithdrawState, WithdrawalContext,
};
use crate::withdraw::validation;

const EVENT_CAPACITY: usize = 32;

#[derive(Default)]
struct Machine {
    state: WithdrawState,
    context: WithdrawalContext,
    transaction: Option<Transaction>,
    reserved_notice: bool,
    last_error: Option<String>,
    epoch: u64,
    minimum_guard: Option<CancellationToken>,
}

struct Shared {
    api: Arc<dyn CashierApi>,
    submitter: Arc<dyn WithdrawSubmitter>,
    risk: RiskGate,
    poller: StatusPoller,
    countdown: CountdownTimer,
    countdown_secs: u32,
    explorers: Vec<ExplorerConfig>,
    events: broadcast::Sender<WithdrawEvent>,
    machine: Mutex<Machine>,
}

/// Drives one withdrawal attempt at a time. Cheap to clone; clones share
/// state. Must be used inside a Tokio runtime.
#[derive(Clone)]
pub struct WithdrawOrchestrator {
    shared: Arc<Shared>,
}

impl WithdrawOrchestrator {
    pub fn new(
        api: Arc<dyn CashierApi>,
        submitter: Arc<dyn WithdrawSubmitter>,
        config: &WithdrawConfig,
        explorers: Vec<ExplorerConfig>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                risk: RiskGate::new(Arc::clone(&api)),
                poller: StatusPoller::from_config(Arc::clone(&api), config),
                api,
                submitter,
                countdown: CountdownTimer::new(),
                countdown_secs: config.countdown_secs,
                explorers,
                events,
                machine: Mutex::new(Machine::default()),
            }),
        }
    }

    // ---- context -------------------------------------------------------

    /// Select the token to withdraw and fetch its minimum. Returns
    /// `Cancelled` when another token was selected (or `reset` ran) before
    /// the fetch resolved; the stale minimum is discarded.
    pub async fn select_token(
        &self,
        token: TokenInfo,
        available_balance: Decimal,
    ) -> Result<Decimal, WithdrawError> {
        let guard = CancellationToken::new();
        {
            let mut m = self.shared.lock();
            if let Some(previous) = m.minimum_guard.replace(guard.clone()) {
                previous.cancel();
            }
            m.context.token = Some(token.clone());
            m.context.available_balance = available_balance;
            m.context.minimum = None;
            m.context.recompute();
        }

        let fetched = self
            .shared
            .api
            .minimum_withdrawal(&token.symbol, token.network)
            .await;

        let mut m = self.shared.lock();
        if guard.is_cancelled() {
            tracing::debug!(token = %token.symbol, "Discarding stale minimum withdrawal");
            return Err(WithdrawError::Cancelled);
        }
        m.minimum_guard = None;
        match fetched {
            Ok(minimum) => {
                m.context.minimum = Some(minimum);
                m.context.recompute();
                tracing::debug!(token = %token.symbol, minimum = %minimum, "Minimum withdrawal loaded");
                Ok(minimum)
            }
            Err(e) => {
                tracing::warn!(token = %token.symbol, error = %e, "Failed to load minimum withdrawal");
                Err(WithdrawError::MinimumUnavailable(e))
            }
        }
    }

    pub fn set_amount(&self, raw: &str) {
        let mut m = self.shared.lock();
        m.context.amount = raw.to_string();
        m.context.recompute();
    }

    pub fn set_destination(&self, raw: &str) {
        let mut m = self.shared.lock();
        m.context.destination = raw.trim().to_string();
        m.context.recompute();
    }

    // ---- actions -------------------------------------------------------

    /// Whether `execute_withdraw` would start a new attempt right now.
    pub fn can_execute(&self) -> bool {
        self.shared.lock().state.accepts_new_attempt()
    }

    /// Run one withdrawal attempt for `profile` using the current context.
    pub async fn execute_withdraw(&self, profile: &UserProfile) -> Result<WithdrawOutcome, WithdrawError> {
        let shared = &self.shared;
        let (epoch, ctx) = {
            let mut m = shared.lock();
            if !m.state.accepts_new_attempt() {
                tracing::debug!(state = ?m.state, "Withdrawal rejected; attempt already in flight");
                return Err(WithdrawError::AttemptInFlight);
            }
            if m.transaction.is_some() || m.state.is_terminal() {
                shared.poller.stop();
                shared.countdown.clear();
                m.transaction = None;
            }
            m.epoch += 1;
            m.state = WithdrawState::Validating;
            m.reserved_notice = false;
            m.last_error = None;
            (m.epoch, m.context.clone())
        };

        // Validating
        // Fail on token, amount and balance before paying for a minimum lookup.
        if let Err(e) = validation::check_amount(&ctx) {
            return shared.abort(epoch, e.into());
        }
        let Some(token) = ctx.token.clone() else {
            return shared.abort(epoch, ValidationError::NoToken.into());
        };
        let minimum = match ctx.minimum {
            Some(minimum) => minimum,
            None => match shared.api.minimum_withdrawal(&token.symbol, token.network).await {
                Ok(minimum) => {
                    let mut m = shared.lock();
                    if m.epoch == epoch {
                        m.context.minimum = Some(minimum);
                        m.context.recompute();
                    }
                    minimum
                }
                Err(e) => return shared.abort(epoch, WithdrawError::MinimumUnavailable(e)),
            },
        };
        let amount = match validation::validate(&ctx, minimum) {
            Ok(amount) => amount,
            Err(e) => return shared.abort(epoch, e.into()),
        };
        if profile.has_pending_withdrawal {
            return shared.abort(epoch, ValidationError::PendingWithdrawal.into());
        }

        // RiskChecking
        shared.advance(epoch, WithdrawState::RiskChecking)?;
        match shared.risk.check(&profile.identity, amount).await {
            RiskVerdict::Ok => {}
            RiskVerdict::Critical { message } => {
                return shared.abort(epoch, WithdrawError::RiskCritical(message))
            }
            RiskVerdict::Error { message } => {
                return shared.abort(epoch, WithdrawError::RiskUnavailable(message))
            }
            RiskVerdict::Reserved => return shared.reserve(epoch),
        }

        let request = WithdrawRequest {
            identity: profile.identity.clone(),
            destination_address: ctx.destination.clone(),
            token_address: token.address.clone(),
            amount: amount.to_string(),
            network: token.network,
            token_type: token.token_type.clone(),
        };

        let hash = if profile.auto_withdraw_enabled {
            shared.advance(epoch, WithdrawState::Preparing)?;
            let prepared = match shared.api.prepare_withdraw(&request).await {
                Ok(prepared) => prepared,
                Err(e) => {
                    tracing::warn!(error = %e, "Withdrawal preparation failed");
                    return shared.abort(epoch, WithdrawError::Preparation(WithdrawError::reason_from_api(&e)));
                }
            };

            shared.advance(epoch, WithdrawState::Submitting)?;
            match shared.submitter.submit(&prepared, amount).await {
                Ok(hash) if hash.trim().is_empty() => {
                    return shared.abort(epoch, WithdrawError::Submission(GENERIC_FAILURE.to_string()))
                }
                Ok(hash) => TxHash::OnChain(hash),
                Err(e) => {
                    tracing::warn!(error = %e, "Withdrawal submission failed");
                    return shared.abort(epoch, WithdrawError::Submission(WithdrawError::reason_from_chain(&e)));
                }
            }
        } else {
            // The manual request is the submission.
            shared.advance(epoch, WithdrawState::Submitting)?;
            if let Err(e) = shared.api.manual_withdraw(&request).await {
                tracing::warn!(error = %e, "Manual withdrawal refused");
                return shared.abort(epoch, WithdrawError::Submission(WithdrawError::reason_from_api(&e)));
            }
            TxHash::ManualApprovalPending
        };

        shared.record(epoch, hash, amount, &token, &profile.identity)
    }

    /// Clear the attempt, stop the poller and countdown, back to `Idle`.
    pub fn reset(&self) {
        let shared = &self.shared;
        let mut m = shared.lock();
        if let Some(guard) = m.minimum_guard.take() {
            guard.cancel();
        }
        shared.poller.stop();
        shared.countdown.clear();
        let epoch = m.epoch + 1;
        *m = Machine {
            epoch,
            ..Machine::default()
        };
        tracing::info!("Withdrawal flow reset");
    }

    /// Apply a terminal status for `hash`. Returns `false` when it does not
    /// match the pending transaction or one was already applied.
    pub fn resolve_terminal(&self, hash: &str, outcome: TerminalOutcome) -> bool {
        self.shared.resolve_terminal(hash, outcome, "caller")
    }

    /// Feed one push message. Only `WITHDRAW` messages with a terminal status
    /// for the pending hash have an effect.
    pub fn handle_push(&self, message: &PushMessage) -> bool {
        self.shared.handle_push(message)
    }

    /// Subscribe to `WITHDRAW` push messages on `registry`.
    pub fn attach_push(&self, registry: &Arc<EventRegistry>) -> Subscription {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        registry.subscribe(MessageKind::Withdraw, move |message| {
            if let Some(shared) = weak.upgrade() {
                shared.handle_push(message);
            }
        })
    }

    // ---- observation ---------------------------------------------------

    pub fn events(&self) -> broadcast::Receiver<WithdrawEvent> {
        self.shared.events.subscribe()
    }

    pub fn state(&self) -> WithdrawState {
        self.shared.lock().state
    }

    pub fn context(&self) -> WithdrawalContext {
        self.shared.lock().context.clone()
    }

    pub fn transaction(&self) -> Option<Transaction> {
        self.shared.lock().transaction.clone()
    }

    /// Whether the "held for security review" notice should be shown.
    pub fn reserved_notice(&self) -> bool {
        self.shared.lock().reserved_notice
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.lock().last_error.clone()
    }

    /// Explorer link for the current transaction. Never produced for the
    /// manual-approval sentinel.
    pub fn explorer_url(&self) -> Option<String> {
        let m = self.shared.lock();
        let tx = m.transaction.as_ref()?;
        let hash = tx.hash.on_chain()?;
        let explorer = self.shared.explorers.iter().find(|e| e.chain_id == tx.network)?;
        Some(format!("{}/tx/{}", explorer.base_url.trim_end_matches('/'), hash))
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.shared.countdown.remaining()
    }

    pub fn is_polling(&self) -> bool {
        self.shared.poller.is_running()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: WithdrawEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn advance(&self, epoch: u64, next: WithdrawState) -> Result<(), WithdrawError> {
        let mut m = self.lock();
        if m.epoch != epoch {
            return Err(WithdrawError::Cancelled);
        }
        tracing::debug!(from = ?m.state, to = ?next, "Withdrawal state change");
        m.state = next;
        Ok(())
    }

    /// End the attempt in `Idle` with `error`.
    fn abort<T>(&self, epoch: u64, error: WithdrawError) -> Result<T, WithdrawError> {
        let mut m = self.lock();
        if m.epoch != epoch {
            return Err(WithdrawError::Cancelled);
        }
        m.state = WithdrawState::Idle;
        m.transaction = None;
        let reason = error.to_string();
        m.last_error = Some(reason.clone());
        metrics::record_withdraw_outcome(error.metric_label());
        tracing::info!(reason = %reason, "Withdrawal attempt aborted");
        self.emit(WithdrawEvent::Rejected { reason });
        Err(error)
    }

    fn reserve(&self, epoch: u64) -> Result<WithdrawOutcome, WithdrawError> {
        let mut m = self.lock();
        if m.epoch != epoch {
            return Err(WithdrawError::Cancelled);
        }
        m.state = WithdrawState::Reserved;
        m.reserved_notice = true;
        metrics::record_withdraw_outcome("reserved");
        tracing::info!("Withdrawal held for security review");
        self.emit(WithdrawEvent::Reserved);
        Ok(WithdrawOutcome::Reserved)
    }

    fn record(
        self: &Arc<Self>,
        epoch: u64,
        hash: TxHash,
        amount: Decimal,
        token: &TokenInfo,
        identity: &str,
    ) -> Result<WithdrawOutcome, WithdrawError> {
        let mut m = self.lock();
        if m.epoch != epoch {
            tracing::warn!(hash = %hash, "Withdrawal submitted after reset; result discarded");
            return Err(WithdrawError::Cancelled);
        }

        let transaction = Transaction {
            hash: hash.clone(),
            kind: TransactionKind::Withdraw,
            amount,
            token_symbol: token.symbol.clone(),
            network: token.network,
            status: TransactionStatus::Pending,
        };
        m.transaction = Some(transaction.clone());
        m.state = WithdrawState::PendingConfirmation;

        self.countdown.start(self.countdown_secs);
        let weak = Arc::downgrade(self);
        let expected = hash.clone();
        self.poller.start(&hash, identity, move |outcome| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            match outcome {
                PollOutcome::Terminal(terminal) => {
                    shared.resolve_terminal(expected.as_str(), terminal, "poll");
                }
                PollOutcome::Exhausted => {
                    tracing::warn!(hash = %expected, "Confirmation polling exhausted; still pending");
                }
            }
        });

        metrics::record_withdraw_outcome("submitted");
        tracing::info!(
            hash = %hash,
            token = %token.symbol,
            network = token.network,
            amount = %amount,
            "Withdrawal pending confirmation"
        );
        self.emit(WithdrawEvent::Submitted { hash });
        Ok(WithdrawOutcome::Submitted(transaction))
    }

    fn resolve_terminal(&self, hash: &str, outcome: TerminalOutcome, source: &'static str) -> bool {
        let mut m = self.lock();
        if m.state != WithdrawState::PendingConfirmation {
            return false;
        }
        let Some(tx) = m.transaction.as_mut() else {
            return false;
        };
        if tx.status != TransactionStatus::Pending || !tx.hash.matches(hash) {
            return false;
        }

        let (status, state) = match outcome {
            TerminalOutcome::Confirmed => (TransactionStatus::Confirmed, WithdrawState::Confirmed),
            TerminalOutcome::Failed => (TransactionStatus::Failed, WithdrawState::Failed),
        };
        tx.status = status;
        let tx_hash = tx.hash.clone();
        m.state = state;

        self.poller.stop();
        self.countdown.stop();
        metrics::record_withdraw_outcome(outcome.as_str());
        tracing::info!(hash = %tx_hash, outcome = outcome.as_str(), source = source, "Withdrawal resolved");
        self.emit(match outcome {
            TerminalOutcome::Confirmed => WithdrawEvent::Confirmed { hash: tx_hash },
            TerminalOutcome::Failed => WithdrawEvent::Failed { hash: tx_hash },
        });
        true
    }

    fn handle_push(&self, message: &PushMessage) -> bool {
        let PushMessage::Withdraw(notification) = message else {
            return false;
        };
        let (Some(hash), Some(status)) = (&notification.hash, &notification.status) else {
            return false;
        };
        match TerminalOutcome::from_status(status) {
            Some(outcome) => self.resolve_terminal(hash, outcome, "push"),
            None => false,
        }
    }
}
