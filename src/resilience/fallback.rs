//! Fallback chain
//!
//! Orchestrates an ordered list of targets. Each target is attempted at
//! most once per invocation through its own admission stack (rate
//! limiter, circuit breaker, retry, executor); the first success wins,
//! and total exhaustion surfaces one [`ErrorRecord`] per target in
//! attempt order.

use crate::models::{ChatRequest, ModelResponse};
use crate::resilience::breaker::CircuitBreaker;
use crate::resilience::limiter::RateLimiter;
use crate::resilience::retry::RetryConfig;
use crate::services::executor::CallExecutor;
use crate::utils::error::{AiError, AiResult, ErrorRecord};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// One target's full admission stack: limiter, breaker, retry, executor.
/// Breaker state is keyed by target inside the shared breaker; the
/// limiter instance belongs to this target alone.
pub struct TargetPipeline {
    /// Target identifier this stack dispatches to
    pub target: String,
    limiter: Option<Arc<RateLimiter>>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryConfig,
    executor: CallExecutor,
}

impl TargetPipeline {
    /// Assemble the stack for one target
    pub fn new(
        target: impl Into<String>,
        limiter: Option<Arc<RateLimiter>>,
        breaker: Arc<CircuitBreaker>,
        retry: RetryConfig,
        executor: CallExecutor,
    ) -> Self {
        Self {
            target: target.into(),
            limiter,
            breaker,
            retry,
            executor,
        }
    }

    /// Dispatch one request through this target's stack. Returns the
    /// outcome together with the number of retries consumed, for the
    /// fallback chain's error records.
    pub async fn dispatch(&self, request: &ChatRequest) -> (AiResult<ModelResponse>, u32) {
        // Admission: rate limiter first, then breaker
        if let Some(limiter) = &self.limiter {
            if let Err(error) = limiter.acquire().await {
                return (Err(error), 0);
            }
        }
        if let Err(error) = self.breaker.check(&self.target) {
            return (Err(error), 0);
        }

        let attempts = AtomicU32::new(0);
        let result = self
            .retry
            .run(&self.target, || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    match self.executor.execute(request).await {
                        Ok(response) => {
                            self.breaker.record_success(&self.target);
                            Ok(response)
                        }
                        Err(error) => {
                            self.breaker.record_failure(&self.target, error.kind());
                            Err(error)
                        }
                    }
                }
            })
            .await;

        let retries = attempts.load(Ordering::SeqCst).saturating_sub(1);
        (result, retries)
    }
}

/// Ordered chain of target pipelines
pub struct FallbackChain {
    targets: Vec<TargetPipeline>,
}

impl FallbackChain {
    /// Build a chain from per-target stacks, attempted in order
    pub fn new(targets: Vec<TargetPipeline>) -> Self {
        Self { targets }
    }

    /// Target identifiers in attempt order
    pub fn target_names(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.target.as_str()).collect()
    }

    /// Dispatch a request, advancing to the next target on any failure.
    /// Each target is attempted at most once; success returns
    /// immediately. When every target fails the result is
    /// [`AiError::AllTargetsFailed`] carrying each target's record in
    /// attempt order.
    pub async fn dispatch(&self, request: &ChatRequest) -> AiResult<ModelResponse> {
        let mut records: Vec<ErrorRecord> = Vec::with_capacity(self.targets.len());

        for pipeline in &self.targets {
            let attempt_request = request.with_target(&pipeline.target);
            let (result, retries) = pipeline.dispatch(&attempt_request).await;
            match result {
                Ok(response) => {
                    if !records.is_empty() {
                        debug!(
                            target_id = %pipeline.target,
                            failed_targets = records.len(),
                            "Fallback target succeeded"
                        );
                    }
                    return Ok(response);
                }
                Err(error) => {
                    warn!(
                        target_id = %pipeline.target,
                        retries,
                        "Target failed, advancing to next: {}",
                        error
                    );
                    records.push(ErrorRecord::new(&pipeline.target, error, retries));
                }
            }
        }

        Err(AiError::AllTargetsFailed(records))
    }
}
