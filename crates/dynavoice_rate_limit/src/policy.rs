//! Bounded execution of collaborator calls.
//!
//! Every platform and persistence call runs under a timeout. Calls that fail
//! with a retryable kind (`RateLimited`, `Timeout`) are retried with
//! exponential backoff and jitter; every other failure is returned at once.

use crate::CallConfig;
use dynavoice_error::{LifecycleError, LifecycleErrorKind, LifecycleResult};
use std::future::Future;
use std::time::Duration;
use tokio_retry2::strategy::{ExponentialBackoff, jitter};
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, warn};

/// Timeout and retry bounds applied to a single logical call.
///
/// # Example
///
/// ```
/// use dynavoice_rate_limit::CallPolicy;
/// use dynavoice_error::LifecycleResult;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let policy = CallPolicy::no_retry(Duration::from_secs(1));
/// let value: LifecycleResult<u32> = policy.call("answer", || async { Ok(42) }).await;
/// assert_eq!(value.unwrap(), 42);
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    timeout: Duration,
    initial_backoff: Duration,
    max_retries: usize,
    max_delay: Duration,
}

impl CallPolicy {
    /// Build a policy from configuration.
    pub fn new(config: &CallConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_retries: config.max_retries,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Timeout only, failures are never retried.
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            timeout,
            initial_backoff: Duration::ZERO,
            max_retries: 0,
            max_delay: Duration::ZERO,
        }
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Retries after the first attempt.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> + use<> {
        // from_millis(2) doubles per attempt; factor scales the first delay
        let factor = (self.initial_backoff.as_millis() as u64 / 2).max(1);
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.max_delay)
            .map(jitter)
            .take(self.max_retries)
    }

    /// Run `operation`, bounding each attempt by the timeout and retrying
    /// retryable failures.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted, a `Timeout` error if
    /// the final attempt did not finish in time, or the first non-retryable
    /// error.
    pub async fn call<F, Fut, T>(&self, operation: &'static str, mut f: F) -> LifecycleResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = LifecycleResult<T>>,
    {
        let timeout = self.timeout;

        Retry::spawn(self.strategy(), || {
            let attempt = f();
            async move {
                let result = match tokio::time::timeout(timeout, attempt).await {
                    Ok(result) => result,
                    Err(_) => Err(LifecycleError::new(LifecycleErrorKind::Timeout(format!(
                        "{operation} did not finish within {}ms",
                        timeout.as_millis()
                    )))),
                };

                match result {
                    Ok(value) => Ok(value),
                    Err(e) if e.kind.is_retryable() => {
                        warn!(operation, error = %e, "Transient error, will retry");
                        let retry_after = match &e.kind {
                            LifecycleErrorKind::RateLimited {
                                retry_after_ms: Some(ms),
                                ..
                            } => Some(Duration::from_millis(*ms)),
                            _ => None,
                        };
                        Err(RetryError::Transient { err: e, retry_after })
                    }
                    Err(e) => {
                        debug!(operation, error = %e, "Permanent error, failing immediately");
                        Err(RetryError::Permanent(e))
                    }
                }
            }
        })
        .await
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::new(&CallConfig::default())
    }
}
