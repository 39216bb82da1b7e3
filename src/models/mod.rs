//! Data model module
//!
//! Request/response types flowing through the pipeline and the shared
//! usage accumulator.

pub mod request;
pub mod response;
pub mod usage;

pub use request::{
    CacheControl, ChatRequest, ContentPart, GenerationParams, Message, MessageContent, Role,
};
pub use response::{ModelResponse, Usage};
pub use usage::{estimate_cost, UsageSnapshot, UsageTracker};
