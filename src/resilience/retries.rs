//! Retry logic.
//!
//! # Responsibilities
//! - Re-run a fallible async operation on retryable errors
//! - Exponential backoff with ±10% jitter between attempts
//! - Propagate non-retryable errors on the first occurrence
//! - Return the last error once attempts are exhausted
//!
//! The sleep between attempts is the only intentional yield point and
//! happens with no lock held.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{ClientError, ClientResult};
use crate::observability::metrics;
use crate::resilience::backoff::{backoff_delay, calculate_backoff};

/// Bounded exponential retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    backoff_factor: f64,
}

impl RetryPolicy {
    /// Create a policy, rejecting parameters outside the supported range.
    ///
    /// `max_retries` counts total attempts and must be at least 1,
    /// `base_delay` must be positive and `backoff_factor` greater than 1.
    pub fn new(max_retries: u32, base_delay: Duration, backoff_factor: f64) -> ClientResult<Self> {
        if max_retries == 0 {
            return Err(ClientError::InvalidArgument(
                "max_retries must be at least 1".into(),
            ));
        }
        if base_delay.is_zero() {
            return Err(ClientError::InvalidArgument(
                "base_delay must be greater than zero".into(),
            ));
        }
        if !(backoff_factor > 1.0) {
            return Err(ClientError::InvalidArgument(
                "backoff_factor must be greater than 1".into(),
            ));
        }

        Ok(Self {
            max_retries,
            base_delay,
            backoff_factor,
        })
    }

    /// Build a policy from configuration.
    pub fn from_config(config: &RetryConfig) -> ClientResult<Self> {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.base_delay_ms),
            config.backoff_factor,
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Un-jittered wait before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        backoff_delay(retry, self.base_delay, self.backoff_factor)
    }

    /// Run `operation`, retrying errors for which `is_retryable` holds.
    ///
    /// The operation is invoked at most `max_retries` times with
    /// `max_retries - 1` sleeps in between.
    pub async fn execute<T, E, F, Fut, P>(
        &self,
        label: &str,
        mut operation: F,
        is_retryable: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !is_retryable(&err) {
                return Err(err);
            }

            if attempt >= self.max_retries {
                tracing::error!(
                    target_name = %label,
                    attempts = attempt,
                    error = %err,
                    "Retries exhausted"
                );
                return Err(err);
            }

            let wait = calculate_backoff(attempt, self.base_delay, self.backoff_factor);
            tracing::warn!(
                target_name = %label,
                attempt,
                max_retries = self.max_retries,
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "Retrying after failure"
            );
            metrics::record_retry(label);

            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }

    /// [`execute`](Self::execute) with the crate's retryable error classes.
    pub async fn run<T, F, Fut>(&self, label: &str, operation: F) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        self.execute(label, operation, ClientError::is_retryable).await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn policy(n: u32) -> RetryPolicy {
        RetryPolicy::new(n, Duration::from_millis(100), 2.0).unwrap()
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(RetryPolicy::new(0, Duration::from_millis(1), 2.0).is_err());
        assert!(RetryPolicy::new(3, Duration::ZERO, 2.0).is_err());
        assert!(RetryPolicy::new(3, Duration::from_millis(1), 1.0).is_err());
        assert!(RetryPolicy::new(3, Duration::from_millis(1), f64::NAN).is_err());
    }

    #[test]
    fn test_delays_strictly_increase() {
        let p = policy(5);
        let delays: Vec<_> = (1..5).map(|r| p.delay_for(r)).collect();
        assert!(delays.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_bound_and_sleeps() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let start = Instant::now();

        let result: ClientResult<()> = policy(3)
            .run("inference", || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(ClientError::Transient("connection reset".into()))
                }
            })
            .await;

        assert_eq!(result, Err(ClientError::Transient("connection reset".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Two sleeps: ~100ms and ~200ms, each within ±10%.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(270), "{elapsed:?}");
        assert!(elapsed <= Duration::from_millis(330), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let result = policy(3)
            .run("identity", || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ClientError::Transient("503".into()))
                    } else {
                        Ok("client")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("client"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_fails_fast() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let start = Instant::now();

        let result: ClientResult<()> = policy(5)
            .run("encryption", || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(ClientError::Permanent("malformed key id".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(ClientError::Permanent(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_custom_predicate() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let p = RetryPolicy::new(4, Duration::from_millis(1), 2.0).unwrap();

        let result: Result<(), String> = p
            .execute(
                "custom",
                || {
                    let c = c.clone();
                    async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        Err("throttled".to_string())
                    }
                },
                |e: &String| e == "throttled",
            )
            .await;

        assert_eq!(result, Err("throttled".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
