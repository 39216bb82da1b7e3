//! Dispatch client
//!
//! Composes the full pipeline around each request: middleware before
//! hooks, similarity-cache check, fallback chain (per target: rate
//! limiter, circuit breaker, retry, call executor), cache store on
//! success, usage recording and middleware after/error hooks.

use crate::cache::SimilarityCache;
use crate::middleware::{Middleware, MiddlewareChain};
use crate::models::{ChatRequest, ModelResponse, UsageSnapshot, UsageTracker};
use crate::resilience::{
    CircuitBreaker, CircuitBreakerConfig, FallbackChain, RateLimiter, RateLimiterConfig,
    RetryConfig, TargetPipeline,
};
use crate::services::batch::{BatchConfig, BatchDispatcher};
use crate::services::executor::{CallExecutor, Transport};
use crate::utils::error::{AiError, AiResult};
use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

struct ClientInner {
    chain: FallbackChain,
    middleware: MiddlewareChain,
    cache: Option<SimilarityCache>,
    tracker: Arc<UsageTracker>,
}

impl ClientInner {
    async fn dispatch(&self, request: ChatRequest) -> AiResult<ModelResponse> {
        let target = request.target.clone();
        let request = self.middleware.apply_before(&target, request).await?;

        // Similarity cache short-circuits everything downstream. Cache
        // collaborator failures degrade to a miss; they never abort the
        // dispatch itself.
        if let Some(cache) = &self.cache {
            match cache.lookup(&request).await {
                Ok(Some(cached)) => {
                    debug!(target_id = %target, "Serving response from similarity cache");
                    self.tracker.record_cache_hit(&cached.usage);
                    return self.middleware.apply_after(cached).await;
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(target_id = %target, "Cache lookup failed, dispatching: {}", error);
                }
            }
        }

        match self.chain.dispatch(&request).await {
            Ok(response) => {
                self.tracker.record(&response.target, &response.usage);
                if let Some(cache) = &self.cache {
                    // A failed insert must not discard the response
                    if let Err(error) = cache.insert(&request, &response).await {
                        warn!(target_id = %target, "Failed to cache response: {}", error);
                    }
                }
                self.middleware.apply_after(response).await
            }
            Err(error) => {
                if let Some(handled) = self.middleware.apply_error(&error, &target).await {
                    debug!(target_id = %target, "Error handled by middleware");
                    return Ok(handled);
                }
                Err(error)
            }
        }
    }
}

/// Client front-end for the resilience and dispatch pipeline
#[derive(Clone)]
pub struct DispatchClient {
    inner: Arc<ClientInner>,
    batch: BatchDispatcher,
}

impl DispatchClient {
    /// Start building a client
    pub fn builder() -> DispatchClientBuilder {
        DispatchClientBuilder::default()
    }

    /// Dispatch one request through the full pipeline
    pub async fn generate(&self, request: ChatRequest) -> AiResult<ModelResponse> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "dispatch",
            request_id = %request_id,
            target_id = %request.target,
        );
        self.inner.dispatch(request).instrument(span).await
    }

    /// Convenience wrapper: single user prompt against the chain's first
    /// target
    pub async fn generate_text(&self, prompt: impl Into<String>) -> AiResult<ModelResponse> {
        let target = self
            .inner
            .chain
            .target_names()
            .first()
            .map(|t| t.to_string())
            .ok_or_else(|| AiError::Config("no targets configured".to_string()))?;
        self.generate(ChatRequest::from_prompt(target, prompt)).await
    }

    /// Dispatch many independent requests with bounded concurrency,
    /// preserving input order in the results
    pub async fn generate_batch(
        &self,
        requests: Vec<ChatRequest>,
    ) -> AiResult<Vec<AiResult<ModelResponse>>> {
        let inner = self.inner.clone();
        self.batch
            .dispatch(requests, move |request| {
                let inner = inner.clone();
                let request_id = Uuid::new_v4();
                let span = info_span!(
                    "dispatch",
                    request_id = %request_id,
                    target_id = %request.target,
                );
                async move { inner.dispatch(request).await }
                    .instrument(span)
                    .boxed()
            })
            .await
    }

    /// Point-in-time usage snapshot
    pub fn usage(&self) -> UsageSnapshot {
        self.inner.tracker.snapshot()
    }

    /// Reset accumulated usage
    pub fn reset_usage(&self) {
        self.inner.tracker.reset()
    }

    /// The shared usage tracker
    pub fn usage_tracker(&self) -> Arc<UsageTracker> {
        self.inner.tracker.clone()
    }
}

/// Builder for [`DispatchClient`]
#[derive(Default)]
pub struct DispatchClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    targets: Vec<String>,
    retry: RetryConfig,
    breaker: CircuitBreakerConfig,
    limiter: Option<RateLimiterConfig>,
    cache: Option<SimilarityCache>,
    middlewares: Vec<Arc<dyn Middleware>>,
    batch: BatchConfig,
    tracker: Option<Arc<UsageTracker>>,
}

impl DispatchClientBuilder {
    /// Transport collaborator performing the actual network calls
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Append one target to the fallback order
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    /// Replace the fallback order wholesale
    pub fn targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Retry configuration shared by every target stack
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Circuit breaker configuration (state still keyed per target)
    pub fn breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    /// Rate limiter configuration; each target gets its own instance
    pub fn rate_limiter(mut self, limiter: RateLimiterConfig) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Similarity cache consulted before dispatch
    pub fn cache(mut self, cache: SimilarityCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Append a middleware (outermost first)
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Batch dispatch configuration
    pub fn batch(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    /// Share an existing usage tracker instead of creating one
    pub fn usage_tracker(mut self, tracker: Arc<UsageTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Assemble the client
    pub fn build(self) -> AiResult<DispatchClient> {
        let transport = self
            .transport
            .ok_or_else(|| AiError::Config("transport is required".to_string()))?;
        if self.targets.is_empty() {
            return Err(AiError::Config("at least one target is required".to_string()));
        }

        let executor = CallExecutor::new(transport);
        let breaker = Arc::new(CircuitBreaker::new(self.breaker));

        let targets = self
            .targets
            .into_iter()
            .map(|target| {
                // Limiter state must never be conflated across targets
                let limiter = self
                    .limiter
                    .map(|config| Arc::new(RateLimiter::new(config)));
                TargetPipeline::new(
                    target,
                    limiter,
                    breaker.clone(),
                    self.retry,
                    executor.clone(),
                )
            })
            .collect();

        Ok(DispatchClient {
            inner: Arc::new(ClientInner {
                chain: FallbackChain::new(targets),
                middleware: MiddlewareChain::new(self.middlewares),
                cache: self.cache,
                tracker: self.tracker.unwrap_or_default(),
            }),
            batch: BatchDispatcher::new(self.batch),
        })
    }
}
