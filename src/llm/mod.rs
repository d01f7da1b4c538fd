// LLM abstraction layer

pub mod provider;
pub mod openai;

pub use provider::*;
pub use crate::types::{ContentPart, LLMMessage, LLMRequest, LLMResponse, MessageContent, TokenUsage};
