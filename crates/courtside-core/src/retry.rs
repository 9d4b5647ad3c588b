//! Bounded exponential backoff for provider calls.
//!
//! Every attempt runs under its own timeout. A timeout counts as a transient
//! provider error, so it is retried like throttling and becomes fatal once
//! the attempt budget is spent.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{Error, ProviderError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 250, max_delay_ms: 4_000, timeout_secs: 30 }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `attempt + 1`; `attempt` is 1-based.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let ms = self.base_delay_ms.saturating_mul(1u64 << exp).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs.max(1)) }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// attempt budget is exhausted.
pub async fn call_with_retry<T, F, Fut>(policy: &RetryPolicy, provider: &str, mut op: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let timeout = policy.timeout();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let outcome = match tokio::time::timeout(timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                provider: provider.to_string(),
                after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(provider, attempt, delay_ms = delay.as_millis() as u64, error = %err, "provider call failed, backing off");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(Error::Provider { attempts: attempt, source: err }),
        }
    }
}
