//! Transport seam and single-attempt call executor
//!
//! The [`Transport`] trait is the boundary between the resilience
//! pipeline and whatever actually performs the network call. Transports
//! must fail with a taxonomy error so the retry and breaker classification
//! logic works unmodified. [`HttpTransport`] is the default
//! implementation, speaking the OpenAI-compatible chat-completions shape.

use crate::config::TransportSettings;
use crate::models::{ChatRequest, Message, MessageContent, ModelResponse, Role, Usage};
use crate::utils::error::{AiError, AiResult};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Network transport collaborator
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request/response exchange. Implementations map every
    /// failure into the [`AiError`] taxonomy.
    async fn send(&self, request: &ChatRequest) -> AiResult<ModelResponse>;
}

/// Default HTTP transport for OpenAI-compatible chat-completions APIs
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport from settings
    pub fn new(settings: &TransportSettings) -> AiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("aidispatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AiError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    fn build_payload(request: &ChatRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| json!({ "role": role_name(m), "content": content_value(m) }))
            .collect();

        let mut payload = json!({
            "model": request.target,
            "messages": messages,
        });
        if let Some(temperature) = request.params.temperature {
            payload["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.params.max_tokens {
            payload["max_tokens"] = json!(max_tokens);
        }
        if let Some(schema) = &request.params.response_schema {
            payload["response_format"] = json!({
                "type": "json_schema",
                "json_schema": schema,
            });
        }
        payload
    }

    fn parse_response(request: &ChatRequest, body: serde_json::Value) -> AiResult<ModelResponse> {
        let text = body["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        let structured = if request.params.response_schema.is_some() {
            serde_json::from_str(&text).ok()
        } else {
            None
        };

        let usage: Usage = serde_json::from_value(normalize_usage(&body["usage"]))
            .unwrap_or_default();

        Ok(ModelResponse {
            text,
            structured,
            usage,
            raw: body,
            target: request.target.clone(),
        })
    }
}

fn role_name(message: &Message) -> &'static str {
    match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn content_value(message: &Message) -> serde_json::Value {
    match &message.content {
        MessageContent::Text(text) => json!(text),
        MessageContent::Parts(_) => json!(message.content.as_text()),
    }
}

// OpenAI reports prompt_tokens/completion_tokens; fold them into the
// provider-neutral usage field names.
fn normalize_usage(raw: &serde_json::Value) -> serde_json::Value {
    json!({
        "input_tokens": raw["prompt_tokens"].as_u64().unwrap_or(0),
        "output_tokens": raw["completion_tokens"].as_u64().unwrap_or(0),
        "cache_read_input_tokens": raw["prompt_tokens_details"]["cached_tokens"]
            .as_u64()
            .unwrap_or(0),
        "cache_creation_input_tokens": 0,
    })
}

/// Map an HTTP status plus body into a taxonomy error
fn status_to_error(status: u16, body: &str) -> AiError {
    // Prefer the provider's own error message when the body parses
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| body.chars().take(200).collect());

    match status {
        401 | 403 => AiError::Authentication(message),
        429 => AiError::RateLimit(message),
        400 | 404 | 413 | 422 => AiError::InvalidRequest(message),
        s => AiError::Provider {
            status: s,
            message,
        },
    }
}

fn transport_error(error: reqwest::Error) -> AiError {
    if error.is_timeout() {
        AiError::Network(format!("request timed out: {}", error))
    } else if error.is_connect() {
        AiError::Network(format!("connection failed: {}", error))
    } else {
        AiError::Network(error.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> AiResult<ModelResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = Self::build_payload(request);

        debug!(target_id = %request.target, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| AiError::Network(format!("failed to read response body: {}", e)))?;
            Self::parse_response(request, body)
        } else {
            let body = response.text().await.unwrap_or_default();
            let err = status_to_error(status.as_u16(), &body);
            error!(target_id = %request.target, status = status.as_u16(), "Provider request failed: {}", err);
            Err(err)
        }
    }
}

/// Performs exactly one call attempt against a transport. No retry, no
/// state; failures pass through already classified by the transport.
#[derive(Clone)]
pub struct CallExecutor {
    transport: Arc<dyn Transport>,
}

impl CallExecutor {
    /// Wrap a transport collaborator
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Dispatch one attempt, stamping the originating target on the
    /// response when the transport left it empty.
    pub async fn execute(&self, request: &ChatRequest) -> AiResult<ModelResponse> {
        let mut response = self.transport.send(request).await?;
        if response.target.is_empty() {
            response.target = request.target.clone();
        }
        debug!(
            target_id = %request.target,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Call attempt succeeded"
        );
        Ok(response)
    }
}
