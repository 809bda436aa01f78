//! Retry-with-backoff for operations against the fetch port
//!
//! An operation runs up to `max_attempts` times. After the n-th failure the caller
//! waits `multiplier * 2^(n-1)`, clamped to `[wait_min, wait_max]`. When every attempt
//! fails the last error is returned unchanged; callers decide how to degrade.
//! `retry_if` stops early on an error its predicate rejects.

use crate::config::RetryConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Attempt budget and backoff curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub multiplier: Duration,
    pub wait_min: Duration,
    pub wait_max: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_retry_fails.max(1),
            multiplier: Duration::from_millis(config.multiplier_ms),
            wait_min: Duration::from_millis(config.wait_min_ms),
            wait_max: Duration::from_millis(config.wait_max_ms),
        }
    }

    /// A policy that never waits between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            multiplier: Duration::ZERO,
            wait_min: Duration::ZERO,
            wait_max: Duration::ZERO,
        }
    }

    /// Wait before the next attempt, after `attempt` (1-based) has failed
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        let raw = self.multiplier.saturating_mul(factor);
        raw.max(self.wait_min).min(self.wait_max)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::from_config(config)
    }
}

/// Runs `op` until it succeeds or the attempt budget is spent
///
/// Every attempt is logged at debug level and every failure at warn level, both with
/// the operation name and the attempt number.
///
/// # Example
///
/// ```
/// use trawl::crawler::{retry, RetryPolicy};
///
/// # async fn example() {
/// let policy = RetryPolicy::immediate(3);
/// let value: Result<u32, String> = retry(&policy, "answer", || async { Ok(42) }).await;
/// assert_eq!(value, Ok(42));
/// # }
/// ```
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_if(policy, operation, |_: &E| true, op).await
}

/// Like `retry`, but returns at once when `should_retry` rejects the error
pub async fn retry_if<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    operation: &str,
    should_retry: R,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    R: Fn(&E) -> bool,
{
    let mut attempt = 1;

    loop {
        tracing::debug!(
            operation,
            attempt,
            max_attempts = policy.max_attempts,
            "Attempting operation"
        );

        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt >= policy.max_attempts => {
                tracing::warn!(
                    operation,
                    attempt,
                    error = %error,
                    "Operation failed, no attempts left"
                );
                return Err(error);
            }
            Err(error) if !should_retry(&error) => {
                tracing::warn!(
                    operation,
                    attempt,
                    error = %error,
                    "Operation failed, not retryable"
                );
                return Err(error);
            }
            Err(error) => {
                let wait = policy.backoff(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    error = %error,
                    wait_ms = wait.as_millis() as u64,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
