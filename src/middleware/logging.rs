//! Logging middleware
//!
//! Logs request prompts, response text and usage through `tracing`, with
//! API-key redaction and configurable truncation so prompts never flood
//! the log output.

use crate::middleware::Middleware;
use crate::models::{ChatRequest, ModelResponse};
use crate::utils::error::{AiError, AiResult};
use async_trait::async_trait;
use tracing::{error, info};

// Known API key prefixes; anything following them is replaced wholesale.
const KEY_PREFIXES: [(&str, &str); 4] = [
    ("sk-ant-", "[REDACTED_ANTHROPIC_KEY]"),
    ("sk-", "[REDACTED_OPENAI_KEY]"),
    ("xai-", "[REDACTED_XAI_KEY]"),
    ("AIza", "[REDACTED_GOOGLE_KEY]"),
];

/// Logging middleware configuration and implementation
#[derive(Debug, Clone)]
pub struct LoggingMiddleware {
    log_prompts: bool,
    log_responses: bool,
    redact_keys: bool,
    max_length: usize,
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self {
            log_prompts: true,
            log_responses: true,
            redact_keys: true,
            max_length: 500,
        }
    }
}

impl LoggingMiddleware {
    /// Middleware with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable prompt logging
    pub fn without_prompts(mut self) -> Self {
        self.log_prompts = false;
        self
    }

    /// Disable response logging
    pub fn without_responses(mut self) -> Self {
        self.log_responses = false;
        self
    }

    /// Maximum characters logged per prompt/response (0 = unlimited)
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    fn sanitize(&self, text: &str) -> String {
        let mut text = if self.max_length > 0 && text.chars().count() > self.max_length {
            let truncated: String = text.chars().take(self.max_length).collect();
            format!("{}...", truncated)
        } else {
            text.to_string()
        };
        if self.redact_keys {
            text = redact(&text);
        }
        text
    }
}

/// Replace anything that looks like a known API key with a marker. Key
/// bodies are alphanumeric plus `-` and `_`; the scan is prefix-ordered
/// so `sk-ant-` wins over the plain `sk-` prefix.
fn redact(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    'outer: while !rest.is_empty() {
        for (prefix, replacement) in KEY_PREFIXES {
            if rest.starts_with(prefix) {
                let body_len = rest[prefix.len()..]
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                    .count();
                // Real keys have long bodies; short matches are left alone
                if body_len >= 16 {
                    out.push_str(replacement);
                    rest = &rest[prefix.len() + body_len..];
                    continue 'outer;
                }
            }
        }
        let mut chars = rest.chars();
        out.push(chars.next().expect("non-empty rest"));
        rest = chars.as_str();
    }
    out
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn before_request(&self, target: &str, request: ChatRequest) -> AiResult<ChatRequest> {
        if self.log_prompts {
            let prompt = self.sanitize(&request.normalized_prompt());
            info!(target_id = target, prompt = %prompt, "Dispatching request");
        }
        Ok(request)
    }

    async fn after_response(&self, response: ModelResponse) -> AiResult<ModelResponse> {
        if self.log_responses {
            let text = self.sanitize(&response.text);
            info!(
                target_id = %response.target,
                text = %text,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "Received response"
            );
        }
        Ok(response)
    }

    async fn on_error(&self, err: &AiError, target: &str) -> Option<ModelResponse> {
        error!(target_id = target, "Request failed: {}", err);
        None
    }
}
