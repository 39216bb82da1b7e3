//! aidispatch
//!
//! Client-side resilience and dispatch pipeline for AI model providers.
//! Every outbound request gets uniform failure handling, cost control and
//! latency hiding: similarity caching, per-target circuit breaking, rate
//! limiting, retry with exponential backoff, ordered model fallback and
//! bounded-concurrency batching.

pub mod cache;
pub mod config;
pub mod middleware;
pub mod models;
pub mod resilience;
pub mod services;
pub mod testing;
pub mod utils;

// Re-export common types
pub use cache::{Embedder, InMemoryVectorStore, SimilarityCache, SimilarityCacheConfig, VectorStore};
pub use config::Settings;
pub use middleware::{CostTrackingMiddleware, LoggingMiddleware, Middleware, MiddlewareChain};
pub use models::{ChatRequest, Message, ModelResponse, Usage, UsageSnapshot, UsageTracker};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, FallbackChain, RateLimiter,
    RateLimiterConfig, RetryConfig, TargetPipeline,
};
pub use services::{
    BatchConfig, BatchDispatcher, CallExecutor, DispatchClient, DispatchClientBuilder,
    HttpTransport, Transport,
};
pub use utils::error::{AiError, AiResult, ErrorKind, ErrorRecord};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
