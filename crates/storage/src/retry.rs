//! Bounded exponential-backoff retry for single remote calls.

use std::future::Future;
use std::time::Duration;

use crate::{Result, StorageError};

/// Retry policy for individual table/blob store calls.
///
/// Retries only failures classified as transient by
/// [`StorageError::is_transient`]; everything else, and the last error once
/// attempts are exhausted, propagates to the caller unchanged. The delay
/// before retry `k` is `base_delay * 2^(k-1)` with no jitter.
///
/// The policy is stateless and covers exactly one call; it does not compose
/// multiple calls into a transaction, and it never retries
/// optimistic-concurrency conflicts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with explicit attempt and delay settings.
    ///
    /// `max_attempts` counts total attempts, including the first.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Runs the operation, retrying transient failures with exponential
    /// backoff.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.base_delay * 2u32.pow(attempt - 1);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient storage failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}
