//! Bounded retry for async operations.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::resilience::backoff::linear_backoff;

/// Attempt budget and delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
        }
    }

    /// Delay after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        linear_backoff(attempt, self.base_delay_ms)
    }
}

/// Last error once the attempt budget is spent.
#[derive(Debug)]
pub struct RetryError<E> {
    pub last: E,
    pub attempts: u32,
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// `op` receives the 1-based attempt number.
pub async fn retry_async<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_async_when(policy, operation, |_| true, op).await
}

/// Like `retry_async`, but stops at the first error `retryable` rejects.
pub async fn retry_async_when<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    operation: &str,
    retryable: P,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !retryable(&e) => {
                tracing::warn!(
                    operation = operation,
                    attempts = attempt,
                    error = %e,
                    "Permanent error, not retrying"
                );
                return Err(RetryError { last: e, attempts: attempt });
            }
            Err(e) if attempt >= policy.max_attempts => {
                tracing::warn!(
                    operation = operation,
                    attempts = attempt,
                    error = %e,
                    "Retries exhausted"
                );
                return Err(RetryError { last: e, attempts: attempt });
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                tracing::debug!(
                    operation = operation,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::linear(3, 1000);
        let started = tokio::time::Instant::now();

        let result: Result<u32, RetryError<String>> = retry_async(&policy, "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(format!("fail {}", attempt))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s + 2s of linear backoff
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_attempts() {
        let policy = RetryPolicy::linear(3, 10);
        let result: Result<(), RetryError<&str>> =
            retry_async(&policy, "test", |_| async { Err("down") }).await;
        let err = result.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last, "down");
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_stops_early() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::linear(3, 10);
        let result: Result<(), RetryError<&str>> = retry_async_when(
            &policy,
            "test",
            |e: &&str| *e != "reverted",
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("reverted") }
            },
        )
        .await;
        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_has_at_least_one_attempt() {
        assert_eq!(RetryPolicy::linear(0, 100).max_attempts, 1);
    }
}
