//! Middleware module
//!
//! The interceptor hook set every pipeline stage can implement.
//! Middlewares compose as an ordered list with classic wrap semantics:
//! `before_request` runs outer-to-inner (list order), `after_response`
//! and `on_error` run inner-to-outer (reverse list order).

pub mod cost;
pub mod logging;

pub use cost::CostTrackingMiddleware;
pub use logging::LoggingMiddleware;

use crate::models::{ChatRequest, ModelResponse};
use crate::utils::error::{AiError, AiResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Interceptor hook set
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Intercept and possibly rewrite the request before dispatch
    async fn before_request(&self, _target: &str, request: ChatRequest) -> AiResult<ChatRequest> {
        Ok(request)
    }

    /// Intercept and possibly rewrite the response after dispatch
    async fn after_response(&self, response: ModelResponse) -> AiResult<ModelResponse> {
        Ok(response)
    }

    /// Observe a terminal error. Returning a response treats the error
    /// as handled and short-circuits recovery.
    async fn on_error(&self, _error: &AiError, _target: &str) -> Option<ModelResponse> {
        None
    }
}

/// Ordered middleware list with wrap-order application helpers
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Empty chain
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self { middlewares }
    }

    /// Append a middleware at the innermost position
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Number of middlewares in the chain
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run `before_request` hooks outer-to-inner
    pub async fn apply_before(
        &self,
        target: &str,
        mut request: ChatRequest,
    ) -> AiResult<ChatRequest> {
        for middleware in &self.middlewares {
            request = middleware.before_request(target, request).await?;
        }
        Ok(request)
    }

    /// Run `after_response` hooks inner-to-outer
    pub async fn apply_after(&self, mut response: ModelResponse) -> AiResult<ModelResponse> {
        for middleware in self.middlewares.iter().rev() {
            response = middleware.after_response(response).await?;
        }
        Ok(response)
    }

    /// Run `on_error` hooks inner-to-outer. The first middleware that
    /// returns a response handles the error; outer hooks still see the
    /// handled response through `after_response` semantics applied by
    /// the caller.
    pub async fn apply_error(&self, error: &AiError, target: &str) -> Option<ModelResponse> {
        for middleware in self.middlewares.iter().rev() {
            if let Some(response) = middleware.on_error(error, target).await {
                return Some(response);
            }
        }
        None
    }
}
