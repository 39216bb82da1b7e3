//! Cost tracking middleware
//!
//! Feeds every response's usage into a shared [`UsageTracker`], priced
//! against the response's originating target. Intended for manually
//! composed pipelines (a bare [`FallbackChain`] or middleware chain);
//! [`DispatchClient`] records usage into its own tracker directly, so
//! installing this middleware on a client with the same tracker counts
//! every response twice.
//!
//! [`FallbackChain`]: crate::resilience::FallbackChain
//! [`DispatchClient`]: crate::services::DispatchClient

use crate::middleware::Middleware;
use crate::models::{ModelResponse, UsageTracker};
use crate::utils::error::AiResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Records token usage and estimated cost for every response that passes
/// through it
pub struct CostTrackingMiddleware {
    tracker: Arc<UsageTracker>,
}

impl CostTrackingMiddleware {
    /// Track into the given shared accumulator
    pub fn new(tracker: Arc<UsageTracker>) -> Self {
        Self { tracker }
    }

    /// The tracker this middleware records into
    pub fn tracker(&self) -> &Arc<UsageTracker> {
        &self.tracker
    }
}

#[async_trait]
impl Middleware for CostTrackingMiddleware {
    async fn after_response(&self, response: ModelResponse) -> AiResult<ModelResponse> {
        self.tracker.record(&response.target, &response.usage);
        Ok(response)
    }
}
