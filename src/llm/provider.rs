use async_trait::async_trait;
use std::sync::Arc;

use crate::config::ExtractionConfig;
use crate::types::{AppResult, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Build the model adapter for receipt extraction.
///
/// Every supported provider speaks the OpenAI chat completions protocol, so
/// the base URL alone selects the backend.
pub fn build_adapter(config: &ExtractionConfig) -> Arc<dyn LLMAdapter> {
    Arc::new(crate::llm::openai::OpenAIAdapter::with_base_url(
        &config.api_key,
        &config.base_url,
    ))
}
