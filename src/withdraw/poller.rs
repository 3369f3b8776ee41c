//! Confirmation polling for submitted withdrawals.
//!
//! # Responsibilities
//! - Query `{kind: "WD", hash, identity}` on a fixed interval
//! - Report the first terminal status exactly once, then stop
//! - Never poll the manual-approval sentinel
//!
//! Failed or unparsable responses are logged and polling continues on the
//! next tick. Polling is unbounded unless a cap is configured.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::api::{CashierApi, StatusRequest};
use crate::config::WithdrawConfig;
use crate::observability::metrics;
use crate::withdraw::types::{TerminalOutcome, TxHash};

/// How a polling run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Terminal(TerminalOutcome),
    /// The configured attempt cap was reached without a terminal status.
    Exhausted,
}

/// Floor for the poll interval; a zero period would make the ticker panic.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct StatusPoller {
    api: Arc<dyn CashierApi>,
    interval: Duration,
    max_attempts: Option<u32>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StatusPoller {
    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn new(api: Arc<dyn CashierApi>, interval: Duration, max_attempts: Option<u32>) -> Self {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                "Poll interval too short; using 1s"
            );
        }
        Self {
            api,
            interval: interval.max(MIN_POLL_INTERVAL),
            max_attempts,
            task: Mutex::new(None),
        }
    }

    pub fn from_config(api: Arc<dyn CashierApi>, config: &WithdrawConfig) -> Self {
        Self::new(
            api,
            Duration::from_secs(config.poll_interval_secs),
            config.max_poll_attempts,
        )
    }

    /// Start polling `hash`, replacing any previous run. Returns `false`
    /// without polling for the manual-approval sentinel.
    pub fn start<F>(&self, hash: &TxHash, identity: &str, on_done: F) -> bool
    where
        F: FnOnce(PollOutcome) + Send + 'static,
    {
        let Some(on_chain) = hash.on_chain() else {
            tracing::debug!("Polling suppressed for manual approval");
            return false;
        };

        let request = StatusRequest::withdraw(on_chain, identity);
        let api = Arc::clone(&self.api);
        let interval = self.interval;
        let max_attempts = self.max_attempts;

        let handle = tokio::spawn(async move {
            let outcome = poll_until_terminal(api, request, interval, max_attempts).await;
            on_done(outcome);
        });

        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = task.replace(handle) {
            previous.abort();
        }
        tracing::info!(hash = %on_chain, interval_secs = interval.as_secs(), "Status polling started");
        true
    }

    /// Stop polling. Safe to call from the completion callback.
    pub fn stop(&self) {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!("Status polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_until_terminal(
    api: Arc<dyn CashierApi>,
    request: StatusRequest,
    interval: Duration,
    max_attempts: Option<u32>,
) -> PollOutcome {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts: u32 = 0;

    loop {
        ticker.tick().await;
        attempts = attempts.saturating_add(1);

        match api.transaction_status(&request).await {
            Ok(response) => match TerminalOutcome::from_status(&response.transaction_status) {
                Some(outcome) => {
                    metrics::record_status_poll("terminal");
                    tracing::info!(
                        hash = %request.hash,
                        status = %response.transaction_status,
                        attempts = attempts,
                        "Withdrawal reached terminal status"
                    );
                    return PollOutcome::Terminal(outcome);
                }
                None => {
                    metrics::record_status_poll("pending");
                    tracing::debug!(hash = %request.hash, status = %response.transaction_status, "Still pending");
                }
            },
            Err(e) => {
                metrics::record_status_poll("error");
                tracing::warn!(hash = %request.hash, error = %e, "Status poll failed; retrying next tick");
            }
        }

        if max_attempts.is_some_and(|max| attempts >= max) {
            tracing::warn!(hash = %request.hash, attempts = attempts, "Status polling gave up");
            return PollOutcome::Exhausted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        ApiError, PreparedWithdrawal, RiskCheckRequest, RiskCheckResponse, StatusResponse,
        WithdrawRequest,
    };
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Script {
        replies: Mutex<VecDeque<Result<String, ApiError>>>,
        calls: Mutex<Vec<StatusRequest>>,
    }

    impl Script {
        fn new(replies: Vec<Result<&str, ApiError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CashierApi for Script {
        async fn risk_check(&self, _: &RiskCheckRequest) -> Result<RiskCheckResponse, ApiError> {
            unreachable!()
        }
        async fn minimum_withdrawal(&self, _: &str, _: u64) -> Result<Decimal, ApiError> {
            unreachable!()
        }
        async fn prepare_withdraw(&self, _: &WithdrawRequest) -> Result<PreparedWithdrawal, ApiError> {
            unreachable!()
        }
        async fn manual_withdraw(&self, _: &WithdrawRequest) -> Result<(), ApiError> {
            unreachable!()
        }
        async fn transaction_status(&self, request: &StatusRequest) -> Result<StatusResponse, ApiError> {
            self.calls.lock().unwrap().push(request.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("PENDING".to_string()));
            reply.map(|transaction_status| StatusResponse { transaction_status })
        }
    }

    fn capture() -> (Arc<Mutex<Vec<PollOutcome>>>, impl FnOnce(PollOutcome) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        (seen, move |outcome| s.lock().unwrap().push(outcome))
    }

    #[tokio::test(start_paused = true)]
    async fn test_sentinel_is_never_polled() {
        let api = Script::new(vec![]);
        let poller = StatusPoller::new(api.clone(), Duration::from_secs(3), None);
        let (seen, done) = capture();

        assert!(!poller.start(&TxHash::ManualApprovalPending, "u1", done));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.call_count(), 0);
        assert!(seen.lock().unwrap().is_empty());
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_terminal_then_stops() {
        let api = Script::new(vec![
            Ok("PENDING"),
            Err(ApiError::Decode("garbage".into())),
            Ok("REJECTED"),
        ]);
        let poller = StatusPoller::new(api.clone(), Duration::from_secs(3), None);
        let (seen, done) = capture();
        assert!(poller.start(&TxHash::OnChain("0xabc".into()), "u1", done));

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(api.call_count(), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(api.call_count(), 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![PollOutcome::Terminal(TerminalOutcome::Failed)]
        );
        assert!(!poller.is_running());

        let request = &api.calls.lock().unwrap()[0];
        assert_eq!(request.kind, "WD");
        assert_eq!(request.hash, "0xabc");
        assert_eq!(request.identity, "u1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_polls() {
        let api = Script::new(vec![]);
        let poller = StatusPoller::new(api.clone(), Duration::from_secs(3), None);
        let (seen, done) = capture();
        poller.start(&TxHash::OnChain("0xabc".into()), "u1", done);

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(api.call_count(), 1);
        poller.stop();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.call_count(), 1);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_cap() {
        let api = Script::new(vec![]);
        let poller = StatusPoller::new(api.clone(), Duration::from_secs(3), Some(2));
        let (seen, done) = capture();
        poller.start(&TxHash::OnChain("0xabc".into()), "u1", done);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.call_count(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![PollOutcome::Exhausted]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised_to_floor() {
        let api = Script::new(vec![Ok("PENDING"), Ok("CONFIRMED")]);
        let poller = StatusPoller::new(api.clone(), Duration::ZERO, None);
        let (seen, done) = capture();
        assert!(poller.start(&TxHash::OnChain("0xabc".into()), "u1", done));

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(api.call_count(), 0);

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(api.call_count(), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![PollOutcome::Terminal(TerminalOutcome::Confirmed)]
        );
    }
}
