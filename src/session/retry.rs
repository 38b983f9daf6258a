use std::time::Duration;

/// How a throttled write reacts to HTTP 429.
///
/// The wait before retry `n` (1-based) is `backoff * multiplier^(n-1)`,
/// never longer than `max_backoff`. `max_attempts` counts every submission
/// including the first; `None` keeps resubmitting until the controller
/// stops answering 429.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Duration,
    pub multiplier: u32,
    pub max_backoff: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(10),
            multiplier: 1,
            max_backoff: Duration::from_secs(300),
            max_attempts: Some(60),
        }
    }
}

impl RetryPolicy {
    /// Fixed backoff with no attempt cap
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            backoff,
            multiplier: 1,
            max_backoff: backoff,
            max_attempts: None,
        }
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(retry.saturating_sub(1));
        self.backoff.saturating_mul(factor).min(self.max_backoff.max(self.backoff))
    }

    /// Whether another submission may follow `attempts` already made
    pub fn allows_another(&self, attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts < max,
            None => true,
        }
    }
}
