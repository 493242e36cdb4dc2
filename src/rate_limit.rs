//! Fixed-interval request pacing.
//!
//! Several of the wrapped exchanges ban clients that exceed a
//! requests-per-interval quota, so the client enforces a minimum interval
//! between consecutive requests it issues.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

/// Enforces a minimum interval between consecutive requests.
///
/// This is deliberately fixed-interval pacing rather than a token bucket:
/// bursts are never permitted, every request pays the full inter-arrival
/// cost. The grant timestamp is recorded before the caller's network call,
/// so spacing holds even when the call itself is slow.
///
/// State is owned by one client instance and never shared across clients.
#[derive(Debug)]
pub struct FixedIntervalLimiter {
    interval: Duration,
    last_grant: Mutex<Option<Instant>>,
}

impl FixedIntervalLimiter {
    /// Create a limiter; a zero interval disables pacing entirely.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_grant: Mutex::new(None),
        }
    }

    /// The configured minimum interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the interval has elapsed since the previous grant, then
    /// record the new grant.
    pub async fn throttle(&self) {
        if self.interval.is_zero() {
            return;
        }
        loop {
            let wait = {
                let mut last = self.last_grant.lock().await;
                let now = Instant::now();
                match *last {
                    Some(prev) if now.duration_since(prev) < self.interval => {
                        self.interval - now.duration_since(prev)
                    }
                    _ => {
                        *last = Some(now);
                        return;
                    }
                }
            };
            debug!(wait_ms = wait.as_millis() as u64, "throttling request");
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_consecutive_grants_are_spaced() {
        let interval = Duration::from_millis(25);
        let limiter = FixedIntervalLimiter::new(interval);

        let mut grants = Vec::new();
        for _ in 0..5 {
            limiter.throttle().await;
            grants.push(Instant::now());
        }

        for pair in grants.windows(2) {
            assert!(
                pair[1].duration_since(pair[0]) >= interval,
                "grants must be at least one interval apart"
            );
        }
    }

    #[tokio::test]
    async fn test_zero_interval_is_noop() {
        let limiter = FixedIntervalLimiter::new(Duration::ZERO);

        let start = Instant::now();
        for _ in 0..100 {
            limiter.throttle().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_concurrent_callers_are_serialized() {
        use std::sync::Arc;

        let interval = Duration::from_millis(15);
        let limiter = Arc::new(FixedIntervalLimiter::new(interval));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.throttle().await;
                Instant::now()
            }));
        }

        let mut grants = Vec::new();
        for handle in handles {
            grants.push(handle.await.unwrap());
        }
        grants.sort();

        for pair in grants.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= interval);
        }
    }
}
