//! Retry policy with exponential backoff.
//!
//! A failed attempt is retried while three conditions hold: the error is
//! worth retrying (see [`RetryPolicy::give_up`]), attempts remain, and the
//! elapsed-time budget is not exhausted. The backoff between attempts grows
//! exponentially from `backoff_factor`.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::error::ExchangeError;

/// Status codes retried by default, as observed across the wrapped
/// exchanges. Callers may override the set per client.
pub const DEFAULT_RETRYABLE_STATUS: [u16; 10] =
    [400, 401, 403, 404, 408, 429, 500, 502, 503, 504];

/// Retry and backoff configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts for one logical call, first try included.
    pub max_retries: u32,
    /// Base backoff in seconds; delay = `backoff_factor * 2^(attempt - 1)`.
    pub backoff_factor: f64,
    /// Upper bound on the total time spent in the retry loop.
    pub max_elapsed: Duration,
    /// Status codes worth retrying; any other status gives up immediately.
    pub retryable_status: HashSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 1.5,
            max_elapsed: Duration::from_secs(30),
            retryable_status: DEFAULT_RETRYABLE_STATUS.into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt following `attempt` failed ones.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let seconds = self.backoff_factor.max(0.0) * 2f64.powi(exponent);
        Duration::from_secs_f64(seconds)
    }

    /// Whether the error should stop the retry loop immediately.
    ///
    /// Connection-level errors without a status code are retryable; a
    /// malformed response or bad configuration would fail identically on
    /// every attempt, so those give up at once.
    pub fn give_up(&self, error: &ExchangeError) -> bool {
        match error {
            ExchangeError::Http(_) | ExchangeError::InvalidResponse(_) => match error.status() {
                Some(status) => !self.retryable_status.contains(&status),
                None => false,
            },
            _ => true,
        }
    }
}

/// Per-call retry bookkeeping: attempt count and elapsed time.
#[derive(Debug)]
pub struct RetryState {
    attempt: u32,
    started: Instant,
}

impl RetryState {
    /// Start tracking a logical call.
    pub fn new() -> Self {
        Self {
            attempt: 0,
            started: Instant::now(),
        }
    }

    /// Number of attempts started so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Time since the logical call began.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record the start of the next attempt; returns its 1-based number.
    pub fn next_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Whether another attempt may be scheduled after a retryable failure.
    pub fn can_retry(&self, policy: &RetryPolicy) -> bool {
        self.attempt < policy.max_retries && self.elapsed() < policy.max_elapsed
    }

    /// Backoff before the next attempt, clipped to the remaining budget.
    pub fn backoff(&self, policy: &RetryPolicy) -> Duration {
        policy
            .delay(self.attempt)
            .min(policy.max_elapsed.saturating_sub(self.elapsed()))
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}
