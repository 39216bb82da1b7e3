//! Response data model

use serde::{Deserialize, Serialize};

/// Token usage metrics reported by a provider for one response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens billed as fresh input
    #[serde(default)]
    pub input_tokens: u64,
    /// Completion tokens
    #[serde(default)]
    pub output_tokens: u64,
    /// Prompt tokens served from the provider's prompt cache
    #[serde(default)]
    pub cache_read_input_tokens: u64,
    /// Prompt tokens written into the provider's prompt cache
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
}

impl Usage {
    /// Total tokens in and out
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Standardized response from any target, immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Generated text
    pub text: String,
    /// Structured payload when a response schema was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<serde_json::Value>,
    /// Usage metrics
    #[serde(default)]
    pub usage: Usage,
    /// Raw provider payload, kept opaque
    #[serde(default)]
    pub raw: serde_json::Value,
    /// Target identifier that produced this response
    #[serde(default)]
    pub target: String,
}

impl ModelResponse {
    /// Build a minimal response, mainly useful in tests and mocks
    pub fn from_text(text: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structured: None,
            usage: Usage::default(),
            raw: serde_json::Value::Null,
            target: target.into(),
        }
    }

    /// Attach usage metrics
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }
}
