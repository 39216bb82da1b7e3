//! Testing utilities
//!
//! Verify pipeline behavior without real network calls. The mock
//! transport returns scripted outcomes in order and counts every call it
//! receives, so tests can assert both results and attempt counts.

use crate::models::{ChatRequest, ModelResponse, Usage};
use crate::services::executor::Transport;
use crate::utils::error::{AiError, AiResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Transport that replays a scripted queue of outcomes
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<AiResult<ModelResponse>>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockTransport {
    /// Empty mock; with nothing scripted every call succeeds with a
    /// default response
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a canned response
    pub fn add_response(&self, text: impl Into<String>) {
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .push_back(Ok(ModelResponse::from_text(text, "").with_usage(Usage {
                input_tokens: 10,
                output_tokens: 5,
                ..Default::default()
            })));
    }

    /// Queue a full response
    pub fn add_model_response(&self, response: ModelResponse) {
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .push_back(Ok(response));
    }

    /// Queue an error outcome
    pub fn add_error(&self, error: AiError) {
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .push_back(Err(error));
    }

    /// Number of calls received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Copies of every request received, in order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .expect("mock request lock poisoned")
            .clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ChatRequest) -> AiResult<ModelResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("mock request lock poisoned")
            .push(request.clone());

        let next = self
            .script
            .lock()
            .expect("mock script lock poisoned")
            .pop_front();
        match next {
            Some(Ok(mut response)) => {
                if response.target.is_empty() {
                    response.target = request.target.clone();
                }
                Ok(response)
            }
            Some(Err(error)) => Err(error),
            None => Ok(ModelResponse::from_text("mock response", &request.target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::helpers;

    #[tokio::test]
    async fn test_scripted_outcomes_in_order() {
        let transport = MockTransport::new();
        transport.add_response("first");
        transport.add_error(helpers::network_error("reset"));
        transport.add_response("second");

        let request = ChatRequest::from_prompt("gpt-4o", "hi");
        assert_eq!(transport.send(&request).await.unwrap().text, "first");
        assert!(transport.send(&request).await.is_err());
        assert_eq!(transport.send(&request).await.unwrap().text, "second");
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_default_response_when_script_empty() {
        let transport = MockTransport::new();
        let request = ChatRequest::from_prompt("gpt-4o", "hi");
        let response = transport.send(&request).await.unwrap();
        assert_eq!(response.text, "mock response");
        assert_eq!(response.target, "gpt-4o");
        assert_eq!(transport.requests().len(), 1);
    }
}
