//! Retry with exponential backoff for transient relayer failures.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::SyncError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
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

    /// Delay after failed attempt `attempt` (0-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }

    /// Run `op` until it succeeds, fails non-transiently, or attempts run out.
    ///
    /// Only [`SyncError::Transient`] is retried. Exhaustion surfaces as
    /// [`SyncError::RetriesExhausted`].
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let max_attempts = self.max_attempts.max(1);

        for attempt in 0..max_attempts {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!("{} succeeded after {} retries", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() => {
                    if attempt + 1 == max_attempts {
                        warn!(
                            "{} failed (attempt {}/{}): {}. Giving up",
                            label,
                            attempt + 1,
                            max_attempts,
                            e
                        );
                        return Err(SyncError::RetriesExhausted {
                            attempts: max_attempts,
                            last: e.to_string(),
                        });
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        label,
                        attempt + 1,
                        max_attempts,
                        e,
                        delay
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        // max_attempts >= 1, so the loop always returns.
        Err(SyncError::RetriesExhausted {
            attempts: max_attempts,
            last: String::new(),
        })
    }
}
