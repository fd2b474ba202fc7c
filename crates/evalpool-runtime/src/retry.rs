//! Backoff policy for waiting on a free worker
//!
//! `Pool::dispatch_with_retry` first spins/yields through a
//! `crossbeam_utils::Backoff`, then falls back to sleeping with an
//! exponentially growing delay capped at `max_delay`.

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_utils::Backoff;

use crate::config::defaults;

/// How long and how hard to retry a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// First sleep once spinning is exhausted
    pub initial_delay: Duration,
    /// Cap on the sleep between attempts
    pub max_delay: Duration,
    /// Give up after this long (None = retry until cancelled)
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_micros(defaults::RETRY_INITIAL_DELAY_US),
            max_delay: Duration::from_micros(defaults::RETRY_MAX_DELAY_US),
            timeout: None,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_delay(mut self, d: Duration) -> Self {
        self.initial_delay = d;
        self
    }

    pub fn max_delay(mut self, d: Duration) -> Self {
        self.max_delay = d;
        self
    }

    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = Some(d);
        self
    }

    pub(crate) fn start(&self) -> Retry {
        Retry {
            backoff: Backoff::new(),
            delay: self.initial_delay,
            max_delay: self.max_delay.max(self.initial_delay),
            // A timeout past the end of `Instant` means no deadline
            deadline: self.timeout.and_then(|t| Instant::now().checked_add(t)),
        }
    }
}

/// Per-call retry state
pub(crate) struct Retry {
    backoff: Backoff,
    delay: Duration,
    max_delay: Duration,
    deadline: Option<Instant>,
}

impl Retry {
    /// Pause before the next attempt.
    ///
    /// Returns `false` once the deadline has passed.
    pub(crate) fn pause(&mut self) -> bool {
        let remaining = match self.deadline {
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(r) if !r.is_zero() => Some(r),
                _ => return false,
            },
            None => None,
        };

        if !self.backoff.is_completed() {
            self.backoff.snooze();
            return true;
        }

        let sleep = match remaining {
            Some(r) => self.delay.min(r),
            None => self.delay,
        };
        thread::sleep(sleep);
        self.delay = self.delay.saturating_mul(2).min(self.max_delay);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert!(policy.initial_delay <= policy.max_delay);
        assert!(policy.timeout.is_none());
    }

    #[test]
    fn test_pause_respects_deadline() {
        let policy = RetryPolicy::new().timeout(Duration::from_millis(20));
        let mut retry = policy.start();
        let start = Instant::now();
        while retry.pause() {}
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(20));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::new()
            .initial_delay(Duration::from_micros(10))
            .max_delay(Duration::from_micros(40));
        let mut retry = policy.start();
        for _ in 0..32 {
            assert!(retry.pause());
        }
        assert_eq!(retry.delay, Duration::from_micros(40));
    }

    #[test]
    fn test_huge_timeout_means_no_deadline() {
        let retry = RetryPolicy::new().timeout(Duration::MAX).start();
        assert!(retry.deadline.is_none());
    }

    #[test]
    fn test_huge_delay_saturates() {
        let policy = RetryPolicy::new()
            .initial_delay(Duration::MAX)
            .timeout(Duration::from_millis(20));
        let mut retry = policy.start();
        let start = Instant::now();
        while retry.pause() {}
        assert_eq!(retry.delay, Duration::MAX);
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
