//! Bounded retry with exponential backoff for remote mutations.
//!
//! Every failed attempt bumps the run-wide `retries_triggered` counter, so the
//! progress line reflects retries from all rename calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::reconcile::ReconciliationCounters;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY_MS: u64 = 30_000;

/// Attempt budget and backoff base for a retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait after the `failures`-th failed attempt (1-based).
    ///
    /// `base, 2*base, 4*base, ...`, saturating on overflow.
    pub fn delay_after_failure(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Error, Debug)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    #[error("Retry limit exceeded after {attempts} attempts")]
    LimitExceeded {
        attempts: u32,
        #[source]
        last: E,
    },

    #[error("Gave up after {attempts} attempts on a permanent error")]
    Permanent {
        attempts: u32,
        #[source]
        last: E,
    },

    #[error("Cancelled before the operation could complete")]
    Cancelled,
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::LimitExceeded { last, .. } | RetryError::Permanent { last, .. } => {
                Some(last)
            }
            RetryError::Cancelled => None,
        }
    }
}

/// Runs fallible async operations under a [`RetryPolicy`].
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    counters: Arc<ReconciliationCounters>,
    cancel: CancellationToken,
}

impl RetryExecutor {
    pub fn new(
        policy: RetryPolicy,
        counters: Arc<ReconciliationCounters>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            policy,
            counters,
            cancel,
        }
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    pub async fn run<F, Fut, T, E>(&self, label: &str, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        self.run_unless(label, operation, |_| false).await
    }

    /// Like [`run`](Self::run), but stops at the first error for which
    /// `is_permanent` holds instead of waiting out the schedule.
    pub async fn run_unless<F, Fut, T, E, P>(
        &self,
        label: &str,
        mut operation: F,
        is_permanent: P,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            attempt += 1;
            debug!(label, attempt, max_attempts, "Attempting operation");

            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            self.counters.record_retry();

            if is_permanent(&err) {
                error!(label, attempt, error = %err, "Permanent failure, not retrying");
                return Err(RetryError::Permanent {
                    attempts: attempt,
                    last: err,
                });
            }

            if attempt >= max_attempts {
                warn!(
                    label,
                    attempt,
                    max_attempts,
                    error = %err,
                    "Giving up after final attempt"
                );
                return Err(RetryError::LimitExceeded {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = self.policy.delay_after_failure(attempt);
            warn!(
                label,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Attempt failed, retrying"
            );

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
