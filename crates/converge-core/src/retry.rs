//! Transient-retry wrapper for mutating calls
//!
//! Some control-plane requests are rejected while a dependency is still being
//! set up or torn down ("detach has a dependency still deleting, try again").
//! [`retry`] re-issues such a call with exponential backoff, but only for
//! errors the caller's classifier marks as transient.

use crate::error::RetryError;
use crate::waiter::deadline_after;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Exponential backoff between attempts
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// Delay after the first failure
    pub initial_delay: Duration,

    /// Upper bound on any single delay
    pub max_delay: Duration,

    /// Growth factor per attempt
    pub multiplier: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0 = first retry)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }
}

type Classifier<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// How long to keep retrying and which errors are worth retrying
pub struct RetryPolicy<E> {
    /// Total time budget across all attempts
    pub max_elapsed: Duration,

    pub backoff: Backoff,

    is_retryable: Classifier<E>,
}

impl<E> RetryPolicy<E> {
    pub fn new(
        max_elapsed: Duration,
        is_retryable: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            max_elapsed,
            backoff: Backoff::default(),
            is_retryable: Arc::new(is_retryable),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn is_retryable(&self, error: &E) -> bool {
        (self.is_retryable)(error)
    }
}

impl<E: 'static> RetryPolicy<E> {
    /// A policy that retries nothing
    pub fn never() -> Self {
        Self::new(Duration::ZERO, |_| false)
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_elapsed: self.max_elapsed,
            backoff: self.backoff.clone(),
            is_retryable: Arc::clone(&self.is_retryable),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_elapsed", &self.max_elapsed)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

/// Run `op`, retrying transient failures until it succeeds or the budget is spent.
///
/// # Returns
/// * `Ok(value)` - some attempt succeeded
/// * `Err(RetryError::Permanent)` - the first non-retryable error, returned as is
/// * `Err(RetryError::Timeout)` - the last transient error once `max_elapsed` ran out
pub async fn retry<T, E, F, Fut>(mut op: F, policy: &RetryPolicy<E>) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let started = Instant::now();
    let deadline = deadline_after(started, policy.max_elapsed);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !policy.is_retryable(&err) {
            tracing::debug!("Attempt {} failed permanently: {}", attempts, err);
            return Err(RetryError::Permanent(err));
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(
                "Giving up after {} attempts in {:?}: {}",
                attempts,
                now - started,
                err
            );
            return Err(RetryError::Timeout {
                cause: err,
                attempts,
                elapsed: now - started,
            });
        }

        let delay = policy
            .backoff
            .delay_for_attempt(attempts - 1)
            .min(deadline - now);
        tracing::warn!(
            "Attempt {} failed with a transient error, retrying in {:?}: {}",
            attempts,
            delay,
            err
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    enum ApiError {
        #[error("IncorrectState: attachment is still deleting")]
        IncorrectState,
        #[error("UnauthorizedOperation")]
        Unauthorized,
    }

    fn transient(e: &ApiError) -> bool {
        matches!(e, ApiError::IncorrectState)
    }

    #[test]
    fn test_delay_calculation() {
        let backoff = Backoff {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10000),
            multiplier: 2.0,
        };

        assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_millis(8000));
        assert_eq!(backoff.delay_for_attempt(4), Duration::from_millis(10000)); // capped at max
        assert_eq!(backoff.delay_for_attempt(u32::MAX), Duration::from_millis(10000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_runs_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(Duration::from_secs(60), |_: &ApiError| false);

        let result: Result<(), _> = retry(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::IncorrectState)
            },
            &policy,
        )
        .await;

        assert!(matches!(
            result,
            Err(RetryError::Permanent(ApiError::IncorrectState))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_then_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(Duration::from_secs(60), transient);

        let result = retry(
            || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(ApiError::IncorrectState)
                } else {
                    Ok(n)
                }
            },
            &policy,
        )
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_budget_retries_without_panicking() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(Duration::from_secs(u64::MAX), transient).with_backoff(
            Backoff {
                max_delay: Duration::MAX,
                ..Backoff::default()
            },
        );

        let result = retry(
            || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 4 {
                    Err(ApiError::IncorrectState)
                } else {
                    Ok(n)
                }
            },
            &policy,
        )
        .await;

        assert_eq!(result.unwrap(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_after_transient_stops_immediately() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(Duration::from_secs(60), transient);

        let result: Result<(), _> = retry(
            || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 1 {
                    Err(ApiError::IncorrectState)
                } else {
                    Err(ApiError::Unauthorized)
                }
            },
            &policy,
        )
        .await;

        assert_eq!(result.unwrap_err().into_cause(), ApiError::Unauthorized);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_wraps_last_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(Duration::from_secs(10), transient);
        let started = Instant::now();

        let result: Result<(), _> = retry(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::IncorrectState)
            },
            &policy,
        )
        .await;

        match result {
            Err(RetryError::Timeout {
                cause,
                attempts,
                elapsed,
            }) => {
                assert_eq!(cause, ApiError::IncorrectState);
                assert_eq!(attempts, calls.load(Ordering::SeqCst));
                assert_eq!(elapsed, Duration::from_secs(10));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        // 1s + 2s + 4s + 3s (capped by the budget)
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_policy() {
        let policy = RetryPolicy::<ApiError>::never();
        let result: Result<(), _> = retry(|| async { Err(ApiError::IncorrectState) }, &policy).await;
        assert!(!result.unwrap_err().is_timeout());
    }
}
