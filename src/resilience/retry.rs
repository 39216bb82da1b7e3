//! Retry wrapper with exponential backoff
//!
//! Re-invokes a wrapped operation on retryable failures. The backoff
//! sleep is a tokio sleep, so a retrying request never blocks unrelated
//! concurrent requests inside the batch dispatcher.

use crate::utils::error::AiResult;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of re-attempts after the first call
    pub max_retries: u32,
    /// Base delay in seconds before the first retry
    pub retry_delay: f64,
    /// Multiplier applied per attempt (>= 1)
    pub backoff_factor: f64,
    /// Scale each delay by a uniform random factor in [0, 1]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: 1.0,
            backoff_factor: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Backoff delay before retry `attempt` (1-indexed):
    /// `retry_delay * backoff_factor^(attempt - 1)`, jitter-scaled when
    /// enabled.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.retry_delay * self.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let secs = if self.jitter {
            base * rand::random::<f64>()
        } else {
            base
        };
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Run `op`, retrying retryable failures up to `max_retries` times.
    /// Non-retryable errors and the last error after budget exhaustion
    /// propagate unchanged.
    pub async fn run<T, F, Fut>(&self, target: &str, mut op: F) -> AiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AiResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(target_id = target, retries = attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !error.is_retryable() {
                        return Err(error);
                    }
                    if attempt >= self.max_retries {
                        warn!(
                            target_id = target,
                            retries = attempt,
                            "Retry budget exhausted: {}",
                            error
                        );
                        return Err(error);
                    }
                    attempt += 1;
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        target_id = target,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable failure, backing off: {}",
                        error
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::{helpers, AiError};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_schedule_without_jitter() {
        let config = RetryConfig {
            max_retries: 3,
            retry_delay: 1.0,
            backoff_factor: 2.0,
            jitter: false,
        };
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs_f64(1.0));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs_f64(2.0));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs_f64(4.0));
    }

    #[test]
    fn test_jitter_bounded_by_base_delay() {
        let config = RetryConfig {
            max_retries: 1,
            retry_delay: 2.0,
            backoff_factor: 1.0,
            jitter: true,
        };
        for _ in 0..100 {
            let delay = config.delay_for_attempt(1);
            assert!(delay <= Duration::from_secs_f64(2.0));
        }
    }

    #[tokio::test]
    async fn test_non_retryable_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::default();
        let result: AiResult<()> = config
            .run("gpt-4o", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(helpers::auth_error("bad key")) }
            })
            .await;
        assert!(matches!(result, Err(AiError::Authentication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_attempt_count() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_retries: 3,
            retry_delay: 1.0,
            backoff_factor: 2.0,
            jitter: false,
        };
        let result: AiResult<()> = config
            .run("gpt-4o", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(helpers::network_error("reset")) }
            })
            .await;
        assert!(matches!(result, Err(AiError::Network(_))));
        // 1 initial attempt + 3 retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eventual_success_stops_retrying() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_retries: 5,
            retry_delay: 0.1,
            backoff_factor: 2.0,
            jitter: false,
        };
        let result = config
            .run("gpt-4o", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(helpers::provider_error(500, "boom"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
