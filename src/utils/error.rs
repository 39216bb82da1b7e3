//! Error handling module
//!
//! Defines the error taxonomy shared by every component in the dispatch
//! pipeline. Retry, circuit breaking and fallback all classify failures
//! through [`ErrorKind`], so transports must map their failures into
//! [`AiError`] rather than surfacing untyped errors.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Pipeline error types
#[derive(Error, Debug, Clone)]
pub enum AiError {
    /// Invalid or rejected credentials (401/403-class). Never retried.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Malformed or rejected request (400-class). Never retried.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider rate-limited the request (429-class). Retryable.
    #[error("Provider rate limit hit: {0}")]
    RateLimit(String),

    /// The provider failed server-side (5xx-class). Retryable.
    #[error("Provider error (status {status}): {message}")]
    Provider {
        /// HTTP status returned by the provider
        status: u16,
        /// Provider-supplied error message
        message: String,
    },

    /// Transport-level failure: timeout, DNS, connection reset. Retryable.
    #[error("Network error: {0}")]
    Network(String),

    /// The circuit breaker rejected admission for a target. Local synthetic
    /// failure, not a call outcome; never retried.
    #[error("Circuit breaker open for target '{0}'")]
    CircuitOpen(String),

    /// The local rate limiter rejected admission in non-blocking mode.
    #[error("Local rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Every target in a fallback chain failed. Carries one record per
    /// target in attempt order.
    #[error("All targets failed ({})", .0.iter().map(|r| r.target.as_str()).collect::<Vec<_>>().join(", "))]
    AllTargetsFailed(Vec<ErrorRecord>),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error classification used by the retry wrapper and circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 401/403-class credential failure
    Authentication,
    /// 400-class malformed request
    InvalidRequest,
    /// 429-class provider rate limit
    RateLimit,
    /// 5xx-class provider failure
    Provider,
    /// Transport-level failure
    Network,
    /// Breaker rejected admission
    CircuitOpen,
    /// Local limiter rejected admission
    RateLimitExceeded,
    /// Aggregate fallback failure
    AllTargetsFailed,
    /// Configuration error
    Config,
}

impl AiError {
    /// Classify this error for retry/breaker decisions
    pub fn kind(&self) -> ErrorKind {
        match self {
            AiError::Authentication(_) => ErrorKind::Authentication,
            AiError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            AiError::RateLimit(_) => ErrorKind::RateLimit,
            AiError::Provider { .. } => ErrorKind::Provider,
            AiError::Network(_) => ErrorKind::Network,
            AiError::CircuitOpen(_) => ErrorKind::CircuitOpen,
            AiError::RateLimitExceeded(_) => ErrorKind::RateLimitExceeded,
            AiError::AllTargetsFailed(_) => ErrorKind::AllTargetsFailed,
            AiError::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether the retry wrapper may re-attempt after this error.
    ///
    /// Only provider rate limits, provider 5xx failures and network
    /// failures are retryable; everything else propagates on first
    /// occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RateLimit | ErrorKind::Provider | ErrorKind::Network
        )
    }

    /// Records attempted per target when this is an aggregate failure
    pub fn attempt_records(&self) -> Option<&[ErrorRecord]> {
        match self {
            AiError::AllTargetsFailed(records) => Some(records),
            _ => None,
        }
    }
}

impl ErrorKind {
    /// The default set of kinds counted by the circuit breaker:
    /// provider rate limits, provider 5xx failures and network failures.
    /// Authentication and invalid-request errors never trip a breaker.
    pub fn default_monitored() -> HashSet<ErrorKind> {
        [ErrorKind::RateLimit, ErrorKind::Provider, ErrorKind::Network]
            .into_iter()
            .collect()
    }
}

/// Record of one failed target attempt, produced at failure time and
/// attached to aggregate fallback/batch results. Never mutated.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    /// Target identifier that was attempted
    pub target: String,
    /// Classification of the final error
    pub kind: ErrorKind,
    /// The underlying error
    pub error: AiError,
    /// Retry count consumed before the attempt was abandoned
    pub retries: u32,
}

impl ErrorRecord {
    /// Build a record from a target's terminal error
    pub fn new(target: impl Into<String>, error: AiError, retries: u32) -> Self {
        Self {
            target: target.into(),
            kind: error.kind(),
            error,
            retries,
        }
    }
}

/// Result type alias
pub type AiResult<T> = Result<T, AiError>;

/// Error construction helpers
pub mod helpers {
    use super::*;

    /// Create an authentication error
    pub fn auth_error(message: impl Into<String>) -> AiError {
        AiError::Authentication(message.into())
    }

    /// Create an invalid-request error
    pub fn invalid_request_error(message: impl Into<String>) -> AiError {
        AiError::InvalidRequest(message.into())
    }

    /// Create a network error
    pub fn network_error(message: impl Into<String>) -> AiError {
        AiError::Network(message.into())
    }

    /// Create a provider error
    pub fn provider_error(status: u16, message: impl Into<String>) -> AiError {
        AiError::Provider {
            status,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AiError::Authentication("test".to_string()).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            AiError::RateLimit("test".to_string()).kind(),
            ErrorKind::RateLimit
        );
        assert_eq!(
            AiError::Provider {
                status: 503,
                message: "overloaded".to_string()
            }
            .kind(),
            ErrorKind::Provider
        );
        assert_eq!(
            AiError::CircuitOpen("gpt-4o".to_string()).kind(),
            ErrorKind::CircuitOpen
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AiError::RateLimit("429".to_string()).is_retryable());
        assert!(AiError::Network("reset".to_string()).is_retryable());
        assert!(AiError::Provider {
            status: 500,
            message: "boom".to_string()
        }
        .is_retryable());

        assert!(!AiError::Authentication("bad key".to_string()).is_retryable());
        assert!(!AiError::InvalidRequest("bad schema".to_string()).is_retryable());
        assert!(!AiError::CircuitOpen("gpt-4o".to_string()).is_retryable());
        assert!(!AiError::RateLimitExceeded("local".to_string()).is_retryable());
    }

    #[test]
    fn test_default_monitored_excludes_auth() {
        let monitored = ErrorKind::default_monitored();
        assert!(monitored.contains(&ErrorKind::RateLimit));
        assert!(monitored.contains(&ErrorKind::Provider));
        assert!(monitored.contains(&ErrorKind::Network));
        assert!(!monitored.contains(&ErrorKind::Authentication));
        assert!(!monitored.contains(&ErrorKind::InvalidRequest));
        assert!(!monitored.contains(&ErrorKind::CircuitOpen));
    }

    #[test]
    fn test_aggregate_error_lists_targets_in_order() {
        let records = vec![
            ErrorRecord::new("a", helpers::network_error("dns"), 3),
            ErrorRecord::new("b", helpers::provider_error(500, "boom"), 1),
        ];
        let err = AiError::AllTargetsFailed(records);
        let message = err.to_string();
        assert!(message.contains("a, b"));

        let records = err.attempt_records().unwrap();
        assert_eq!(records[0].target, "a");
        assert_eq!(records[0].retries, 3);
        assert_eq!(records[1].kind, ErrorKind::Provider);
    }

    #[test]
    fn test_helpers() {
        assert!(matches!(
            helpers::auth_error("x"),
            AiError::Authentication(_)
        ));
        assert!(matches!(
            helpers::provider_error(502, "x"),
            AiError::Provider { status: 502, .. }
        ));
    }
}
