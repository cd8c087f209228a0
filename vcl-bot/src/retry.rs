//! Fixed-delay retry policy with an injectable sleeper
//!
//! Channel resolution retries forever with a fixed delay. The policy is a
//! value so that tests can bound it, and sleeping goes through [`Sleeper`] so
//! that tests never wait on the wall clock.

use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;
use vcl_common::config::DEFAULT_RETRY_DELAY_MS;

/// Suspends the current task for a duration
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Error classification for retry decisions
pub trait Retryable {
    /// True when waiting and trying again may succeed
    fn is_retryable(&self) -> bool;
}

/// How often and how long to wait between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed delay before each retry
    pub delay: Duration,
    /// Total attempts allowed; `None` retries forever
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry forever with a fixed delay
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` total attempts
    pub fn bounded(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts.max(1)),
        }
    }

    /// Whether another attempt may follow failed attempt number `attempt` (1-based)
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt < max,
            None => true,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.max_attempts.is_some()
    }

    pub fn delay_ms(&self) -> u64 {
        u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_millis(DEFAULT_RETRY_DELAY_MS))
    }
}

/// Outcome of a retry loop that did not produce a value
#[derive(Debug)]
pub struct RetryFailure<E> {
    /// Attempts made, including the last one
    pub attempts: u32,
    /// Error from the last attempt
    pub error: E,
}

/// Run `operation` until it succeeds or a bounded policy gives up.
///
/// An unbounded policy retries every error. Under a bounded policy a
/// non-retryable error ends the loop early.
///
/// `on_retry` is called with the failed attempt number and its error right
/// before each sleep.
pub async fn retry<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    operation: &str,
    mut attempt_fn: F,
    mut on_retry: R,
) -> Result<T, RetryFailure<E>>
where
    E: Retryable + Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: FnMut(u32, &E),
{
    let mut attempt = 1;
    loop {
        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let give_up = policy.is_bounded()
                    && (!error.is_retryable() || !policy.allows_retry_after(attempt));
                if give_up {
                    return Err(RetryFailure {
                        attempts: attempt,
                        error,
                    });
                }

                warn!("Error {}: {}", operation, error);
                warn!("Retrying in {} ms...", policy.delay_ms());
                on_retry(attempt, &error);

                sleeper.sleep(policy.delay).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}
