//! Request data model
//!
//! A [`ChatRequest`] is immutable once dispatched into the pipeline:
//! components clone it, they never mutate it in place.

use serde::{Deserialize, Serialize};

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
    /// Tool result
    Tool,
}

/// One typed part of a multimodal message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    /// Plain text part
    Text {
        /// The text content
        text: String,
    },
    /// Inline image part
    Image {
        /// MIME type, e.g. "image/jpeg"
        media_type: String,
        /// Base64-encoded image bytes
        base64_data: String,
    },
}

/// Message content: plain text or a list of typed parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content
    Text(String),
    /// Multimodal content
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Text rendering of this content; image parts contribute a marker
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .map(|p| match p {
                    ContentPart::Text { text } => text.as_str(),
                    ContentPart::Image { .. } => "[image]",
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Prompt caching hint attached to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheControl {
    /// Provider-side ephemeral prompt caching
    Ephemeral,
}

/// One entry in the ordered message sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author role
    pub role: Role,
    /// Message content
    pub content: MessageContent,
    /// Optional provider-side prompt caching hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

impl Message {
    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(text.into()),
            cache_control: None,
        }
    }

    /// Attach an ephemeral cache-control hint
    pub fn with_cache_control(mut self) -> Self {
        self.cache_control = Some(CacheControl::Ephemeral);
        self
    }
}

/// Generation parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum output tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// JSON schema constraining the structured response payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

/// One request into the dispatch pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Target (model/backend) identifier
    pub target: String,
    /// Ordered message sequence
    pub messages: Vec<Message>,
    /// Generation parameters
    #[serde(default)]
    pub params: GenerationParams,
}

impl ChatRequest {
    /// Build a single-user-message request
    pub fn from_prompt(target: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            messages: vec![Message::user(prompt)],
            params: GenerationParams::default(),
        }
    }

    /// Build a request from a full message sequence
    pub fn from_messages(target: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            target: target.into(),
            messages,
            params: GenerationParams::default(),
        }
    }

    /// Replace the target identifier, leaving everything else intact.
    /// Used by the fallback chain when advancing to the next candidate.
    pub fn with_target(&self, target: impl Into<String>) -> Self {
        let mut request = self.clone();
        request.target = target.into();
        request
    }

    /// Set generation parameters
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Normalized prompt text used as the similarity-cache key: roles and
    /// content flattened, whitespace collapsed, lowercased.
    pub fn normalized_prompt(&self) -> String {
        let joined = self
            .messages
            .iter()
            .map(|m| m.content.as_text())
            .collect::<Vec<_>>()
            .join("\n");
        joined
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = Message::user("hello").with_cache_control();
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, MessageContent::Text("hello".to_string()));
        assert_eq!(msg.cache_control, Some(CacheControl::Ephemeral));
    }

    #[test]
    fn test_multimodal_as_text() {
        let content = MessageContent::Parts(vec![
            ContentPart::Text {
                text: "describe".to_string(),
            },
            ContentPart::Image {
                media_type: "image/png".to_string(),
                base64_data: "aGk=".to_string(),
            },
        ]);
        assert_eq!(content.as_text(), "describe [image]");
    }

    #[test]
    fn test_normalized_prompt() {
        let request = ChatRequest::from_messages(
            "gpt-4o",
            vec![Message::system("Be  Brief "), Message::user("  What IS\nrust?")],
        );
        assert_eq!(request.normalized_prompt(), "be brief what is rust?");
    }

    #[test]
    fn test_with_target_preserves_messages() {
        let request = ChatRequest::from_prompt("gpt-4o", "hi");
        let retargeted = request.with_target("claude-3-5-sonnet");
        assert_eq!(retargeted.target, "claude-3-5-sonnet");
        assert_eq!(retargeted.messages, request.messages);
    }

    #[test]
    fn test_serialization_skips_empty_options() {
        let request = ChatRequest::from_prompt("gpt-4o", "hi");
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["messages"][0].get("cache_control").is_none());
        assert!(json["params"].get("temperature").is_none());
    }
}
