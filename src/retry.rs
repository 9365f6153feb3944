//! Per-folder transient-failure budget.

use std::iter::Take;
use std::time::Duration;
use tokio_retry2::strategy::FixedInterval;

/// What to do after a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then try the same request again.
    RetryAfter(Duration),
    /// The budget is spent; the failure is final.
    GiveUp,
}

/// Counts transient failures for a single folder.
///
/// A fresh counter is created on every folder visit and never shared. With a
/// budget of `max_attempts`, the first `max_attempts - 1` failures yield a
/// retry and the last one yields [`RetryDecision::GiveUp`].
pub struct AttemptCounter {
    failures: u32,
    delays: Take<FixedInterval>,
}

impl AttemptCounter {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        let retries = max_attempts.saturating_sub(1) as usize;
        let millis = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        Self {
            failures: 0,
            delays: FixedInterval::from_millis(millis).take(retries),
        }
    }

    pub fn record_failure(&mut self) -> RetryDecision {
        self.failures += 1;
        match self.delays.next() {
            Some(delay) => RetryDecision::RetryAfter(delay),
            None => RetryDecision::GiveUp,
        }
    }

    /// Failures recorded so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}
