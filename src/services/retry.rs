//! Retry policy executor with exponential backoff.
//!
//! Wraps any unreliable async operation. Transient failures are retried with
//! exponential backoff up to `max_attempts`; every failed attempt leaves a
//! `RetryAttempt` record, and exhaustion surfaces them all. Non-transient
//! failures fail immediately without retry.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::error::Retryable;
use crate::domain::models::RetryConfig;

/// Retry policy: `{max_attempts, initial_delay, multiplier, max_delay}`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    max_attempts: u32,
    initial_delay_ms: u64,
    multiplier: f64,
    max_delay_ms: u64,
}

/// Record of one failed attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryAttempt {
    /// 1-indexed attempt number.
    pub attempt_number: u32,
    /// Backoff waited before this attempt; 0 for the first.
    pub delay_before_ms: u64,
    pub error_kind: String,
    /// True once max attempts are exhausted.
    pub terminal: bool,
}

/// Successful result plus the transient failures that preceded it.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub value: T,
    pub attempts: Vec<RetryAttempt>,
}

/// Failure of a retried operation.
#[derive(Error, Debug)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// All attempts failed transiently; carries every attempt record.
    #[error("retries exhausted after {} attempts", attempts.len())]
    Exhausted {
        attempts: Vec<RetryAttempt>,
        #[source]
        last: E,
    },

    /// A non-transient error; never retried.
    #[error("non-retryable failure")]
    Fatal(#[source] E),
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    pub fn attempts(&self) -> &[RetryAttempt] {
        match self {
            Self::Exhausted { attempts, .. } => attempts,
            Self::Fatal(_) => &[],
        }
    }

    pub fn into_source(self) -> E {
        match self {
            Self::Exhausted { last, .. } | Self::Fatal(last) => last,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay_ms: u64, multiplier: f64, max_delay_ms: u64) -> Self {
        assert!(max_attempts > 0, "max_attempts must be greater than 0");
        Self {
            max_attempts,
            initial_delay_ms,
            multiplier,
            max_delay_ms,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.initial_delay_ms,
            config.multiplier,
            config.max_delay_ms,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff waited after `attempt` (1-indexed) fails:
    /// `min(initial * multiplier^(attempt-1), max_delay)`.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay = (self.initial_delay_ms as f64 * factor).round();
        if delay.is_finite() && delay >= 0.0 {
            (delay as u64).min(self.max_delay_ms)
        } else {
            self.max_delay_ms
        }
    }

    /// Execute `operation`, retrying transient failures.
    ///
    /// Returns the value along with records of any failed attempts, or a
    /// `RetryError` once attempts exhaust or a permanent error appears.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<RetryOutcome<T>, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::error::Error + 'static,
    {
        let mut attempts: Vec<RetryAttempt> = Vec::new();
        let mut delay_before_ms = 0u64;

        for attempt in 1..=self.max_attempts {
            if delay_before_ms > 0 {
                sleep(Duration::from_millis(delay_before_ms)).await;
            }

            match operation().await {
                Ok(value) => {
                    if !attempts.is_empty() {
                        debug!(
                            attempt,
                            failures = attempts.len(),
                            "operation succeeded after retries"
                        );
                    }
                    return Ok(RetryOutcome { value, attempts });
                }
                Err(err) if !err.is_transient() => {
                    debug!(error = %err, "permanent error, not retrying");
                    return Err(RetryError::Fatal(err));
                }
                Err(err) => {
                    let terminal = attempt == self.max_attempts;
                    attempts.push(RetryAttempt {
                        attempt_number: attempt,
                        delay_before_ms,
                        error_kind: err.error_kind().to_string(),
                        terminal,
                    });

                    if terminal {
                        warn!(
                            attempts = self.max_attempts,
                            error = %err,
                            "retries exhausted"
                        );
                        return Err(RetryError::Exhausted {
                            attempts,
                            last: err,
                        });
                    }

                    delay_before_ms = self.backoff_ms(attempt);
                    warn!(
                        attempt,
                        next_delay_ms = delay_before_ms,
                        error = %err,
                        "transient error, backing off"
                    );
                }
            }
        }

        unreachable!("loop returns on success, exhaustion, or fatal error");
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
