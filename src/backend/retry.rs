//! Exponential backoff policy for retrying requests
//!
//! Delays double with each attempt index: with the default one-second base,
//! attempts 0, 1 and 2 are followed by 1s, 2s and 4s respectively. Waiting is
//! delegated to a [`Sleeper`] so callers can observe or skip real time.

use crate::config::FollowUpConfig;
use async_trait::async_trait;
use std::time::Duration;

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first
    pub max_attempts: u32,
    /// Delay after attempt 0
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff to wait after the given zero-based attempt failed
    ///
    /// # Examples
    ///
    /// ```
    /// use medrax::backend::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    /// assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    /// ```
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Whether the zero-based attempt is the final one allowed
    pub fn is_last(&self, attempt: u32) -> bool {
        attempt + 1 >= self.max_attempts
    }

    /// Sum of every backoff the policy can incur between attempts
    pub fn worst_case_delay(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| self.delay_for(attempt))
            .sum()
    }
}

impl From<&FollowUpConfig> for RetryPolicy {
    fn from(config: &FollowUpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

/// Suspends the retrying flow between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for the given duration
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
