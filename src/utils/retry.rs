use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use crate::Result;

/// Exponential backoff for operations that may fail while a dependency comes up
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

pub async fn retry_with_backoff<F, Fut, T>(label: &str, policy: &RetryPolicy, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("✅ RETRY: {} succeeded on attempt {}", label, attempt);
                }
                return Ok(value);
            }
            Err(e) if attempt < attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    "⚠️ RETRY: {} attempt {}/{} failed: {}, retrying in {}ms",
                    label,
                    attempt,
                    attempts,
                    e,
                    delay.as_millis()
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!("❌ RETRY: {} failed after {} attempts: {}", label, attempts, e);
                return Err(e);
            }
        }
    }
}
