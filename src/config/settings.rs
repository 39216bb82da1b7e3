//! Application configuration settings
//!
//! Aggregates every component's configuration and loads the
//! transport-facing pieces from the environment, `.env` included.

use crate::resilience::{RateLimiterConfig, RetryConfig};
use crate::services::batch::BatchConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::warn;

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    /// API key sent as a bearer token
    pub api_key: String,
    /// API base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Circuit breaker settings in serializable form
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BreakerSettings {
    /// Consecutive monitored failures that open the circuit
    pub failure_threshold: u32,
    /// Seconds an open circuit rejects calls before admitting a probe
    pub recovery_timeout_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 60,
        }
    }
}

impl BreakerSettings {
    /// Convert to the breaker's runtime configuration with the default
    /// monitored kinds
    pub fn to_config(self) -> crate::resilience::CircuitBreakerConfig {
        crate::resilience::CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_secs),
            monitored: crate::utils::error::ErrorKind::default_monitored(),
        }
    }
}

/// Batch settings in serializable form
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Maximum operations in flight
    pub concurrency: usize,
    /// Keep per-slot errors instead of failing the whole batch
    pub return_exceptions: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        let defaults = BatchConfig::default();
        Self {
            concurrency: defaults.concurrency,
            return_exceptions: defaults.return_exceptions,
        }
    }
}

impl BatchSettings {
    /// Convert to the dispatcher's runtime configuration
    pub fn to_config(self) -> BatchConfig {
        BatchConfig {
            concurrency: self.concurrency,
            return_exceptions: self.return_exceptions,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Transport configuration
    pub transport: TransportSettings,
    /// Retry configuration
    pub retry: RetryConfig,
    /// Rate limiter configuration
    pub rate_limiter: RateLimiterConfig,
    /// Circuit breaker configuration
    pub breaker: BreakerSettings,
    /// Batch dispatch configuration
    pub batch: BatchSettings,
}

impl Settings {
    /// Load settings from environment variables with defaults. Reads a
    /// `.env` file when present.
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        let transport = TransportSettings {
            api_key: env::var("AIDISPATCH_API_KEY").unwrap_or_else(|_| {
                warn!("AIDISPATCH_API_KEY not set; transport requests will be unauthenticated");
                String::new()
            }),
            base_url: env::var("AIDISPATCH_BASE_URL")
                .unwrap_or(defaults.transport.base_url),
            timeout_secs: parse_env("AIDISPATCH_TIMEOUT_SECS", defaults.transport.timeout_secs),
        };

        Ok(Self {
            transport,
            retry: RetryConfig {
                max_retries: parse_env("AIDISPATCH_MAX_RETRIES", defaults.retry.max_retries),
                retry_delay: parse_env("AIDISPATCH_RETRY_DELAY", defaults.retry.retry_delay),
                backoff_factor: parse_env(
                    "AIDISPATCH_BACKOFF_FACTOR",
                    defaults.retry.backoff_factor,
                ),
                jitter: parse_env("AIDISPATCH_RETRY_JITTER", defaults.retry.jitter),
            },
            rate_limiter: RateLimiterConfig {
                requests_per_minute: parse_env(
                    "AIDISPATCH_REQUESTS_PER_MINUTE",
                    defaults.rate_limiter.requests_per_minute,
                ),
                blocking: parse_env(
                    "AIDISPATCH_RATE_LIMIT_BLOCKING",
                    defaults.rate_limiter.blocking,
                ),
            },
            breaker: BreakerSettings {
                failure_threshold: parse_env(
                    "AIDISPATCH_FAILURE_THRESHOLD",
                    defaults.breaker.failure_threshold,
                ),
                recovery_timeout_secs: parse_env(
                    "AIDISPATCH_RECOVERY_TIMEOUT_SECS",
                    defaults.breaker.recovery_timeout_secs,
                ),
            },
            batch: BatchSettings {
                concurrency: parse_env("AIDISPATCH_BATCH_CONCURRENCY", defaults.batch.concurrency),
                return_exceptions: parse_env(
                    "AIDISPATCH_BATCH_RETURN_EXCEPTIONS",
                    defaults.batch.return_exceptions,
                ),
            },
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable value for {}", key);
            default
        }),
        Err(_) => default,
    }
}
