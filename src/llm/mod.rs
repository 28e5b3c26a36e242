//! LLM integration.
//!
//! Only Google Gemini is wired up today, through its OpenAI-compatible
//! chat completions endpoint with API key auth.

mod google;
mod provider;

pub use google::GoogleGeminiProvider;
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

use std::sync::Arc;

use crate::config::{LlmConfig, LlmProviderType};
use crate::error::LlmError;

/// Create an LLM provider based on configuration.
pub fn create_llm_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.provider {
        LlmProviderType::Google => {
            tracing::info!(
                "Using direct Google Gemini API (AI Studio), model {}",
                config.google.model
            );
            Ok(Arc::new(GoogleGeminiProvider::new(config.google.clone())?))
        }
    }
}
