//! Resilience module
//!
//! Failure-handling wrappers composed around the call executor: retry
//! with exponential backoff, per-target circuit breaking, token-bucket
//! rate limiting and the ordered fallback chain.

pub mod breaker;
pub mod fallback;
pub mod limiter;
pub mod retry;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use fallback::{FallbackChain, TargetPipeline};
pub use limiter::{RateLimiter, RateLimiterConfig};
pub use retry::RetryConfig;
