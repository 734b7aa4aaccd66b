use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Retry;
use super::ClientError;

/// Bounded retry with exponential backoff for transient client errors
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    pub fn from_config(retry: &Retry) -> Self {
        Self::new(retry.max_attempts, Duration::from_millis(retry.base_backoff_ms))
    }

    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before attempt `attempt + 1`; doubles each time
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(1u32 << exponent)
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff_for(attempt);
                    warn!(
                        operation = operation,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient error, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!(operation = operation, attempt = attempt, error = %e, "Giving up");
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&Retry::default())
    }
}
