//! Rate limiter
//!
//! Token bucket admission gate: capacity of `requests_per_minute` tokens,
//! refilled continuously at capacity-per-60-seconds based on elapsed
//! time. Blocking mode suspends the caller until a token frees up;
//! non-blocking mode fails immediately.

use crate::utils::error::{AiError, AiResult};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

const WINDOW_SECS: f64 = 60.0;

/// Rate limiter configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Bucket capacity and refill amount per 60-second window
    pub requests_per_minute: u32,
    /// Suspend callers until a slot frees instead of failing immediately
    pub blocking: bool,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            blocking: true,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket rate limiter. One instance gates one logical call path;
/// limiter state is never shared across distinct targets.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter with a full bucket
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            bucket: Mutex::new(Bucket {
                tokens: f64::from(config.requests_per_minute),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Refill the bucket from elapsed time and try to take one token.
    /// Returns the wait until a token will be available on refusal.
    fn try_take(&self) -> Result<(), Duration> {
        let capacity = f64::from(self.config.requests_per_minute);
        let refill_per_sec = capacity / WINDOW_SECS;

        let mut bucket = self.bucket.lock().expect("limiter lock poisoned");
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * refill_per_sec).min(capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - bucket.tokens;
            Err(Duration::from_secs_f64(deficit / refill_per_sec))
        }
    }

    /// Admission gate. In blocking mode this suspends (without holding
    /// the bucket lock) until a token is available; in non-blocking mode
    /// it fails with [`AiError::RateLimitExceeded`].
    pub async fn acquire(&self) -> AiResult<()> {
        loop {
            match self.try_take() {
                Ok(()) => return Ok(()),
                Err(wait) => {
                    if !self.config.blocking {
                        return Err(AiError::RateLimitExceeded(format!(
                            "{} requests per minute exhausted",
                            self.config.requests_per_minute
                        )));
                    }
                    debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
                    // Rounding can produce a zero-length wait; sleep at
                    // least one timer tick so the loop always yields time.
                    tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
                }
            }
        }
    }

    /// Tokens currently available (for observability and tests)
    pub fn available(&self) -> f64 {
        let bucket = self.bucket.lock().expect("limiter lock poisoned");
        bucket.tokens
    }
}
