//! Advisory countdown shown while a withdrawal is pending.
//!
//! Reaching zero changes nothing in the withdrawal flow.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

const TICK: Duration = Duration::from_secs(1);

#[derive(Default)]
struct CountdownState {
    remaining: u32,
    run: u64,
    task: Option<JoinHandle<()>>,
}

/// 1 s decrementing timer. Must be started inside a Tokio runtime.
#[derive(Default)]
pub struct CountdownTimer {
    state: Arc<Mutex<CountdownState>>,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)start at `seconds`.
    pub fn start(&self, seconds: u32) {
        let mut state = lock(&self.state);
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.remaining = seconds;
        state.run += 1;
        if seconds == 0 {
            return;
        }

        let run = state.run;
        let shared = Arc::clone(&self.state);
        state.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            loop {
                ticker.tick().await;
                let mut state = lock(&shared);
                if state.run != run {
                    return;
                }
                state.remaining = state.remaining.saturating_sub(1);
                if state.remaining == 0 {
                    state.task = None;
                    tracing::debug!("Countdown elapsed");
                    return;
                }
            }
        }));
    }

    pub fn remaining(&self) -> u32 {
        lock(&self.state).remaining
    }

    /// Freeze at the current value.
    pub fn stop(&self) {
        let mut state = lock(&self.state);
        state.run += 1;
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }

    /// Stop and return to zero.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.run += 1;
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.remaining = 0;
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).task.is_some()
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(state: &Mutex<CountdownState>) -> MutexGuard<'_, CountdownState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_and_stops_at_zero() {
        let timer = CountdownTimer::new();
        timer.start(3);
        assert_eq!(timer.remaining(), 3);
        assert!(timer.is_running());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(timer.remaining(), 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(timer.remaining(), 0);
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_freezes_and_clear_zeroes() {
        let timer = CountdownTimer::new();
        timer.start(90);
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        timer.stop();
        assert_eq!(timer.remaining(), 80);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(timer.remaining(), 80);
        assert!(!timer.is_running());

        timer.clear();
        assert_eq!(timer.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_previous_run() {
        let timer = CountdownTimer::new();
        timer.start(5);
        tokio::time::sleep(Duration::from_millis(2500)).await;
        timer.start(10);
        assert_eq!(timer.remaining(), 10);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(timer.remaining(), 9);
    }
}
