//! Natural-language question to SQL.

use std::sync::Arc;

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::query::schema::generation_prompt;

/// Turns a question into SQL text with one model call.
pub struct QueryGenerator {
    llm: Arc<dyn LlmProvider>,
    prompt: String,
}

impl QueryGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            prompt: generation_prompt(),
        }
    }

    /// Generate SQL for `question`.
    ///
    /// The text is returned as the model wrote it, minus surrounding
    /// whitespace. It is not validated here; execution is the check.
    pub async fn generate(&self, question: &str) -> Result<String, LlmError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(self.prompt.clone()),
            ChatMessage::user(question),
        ]);

        let response = self.llm.complete(request).await?;
        let sql = response.content.trim();

        if sql.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.llm.model_name().to_string(),
                reason: "empty SQL in response".to_string(),
            });
        }

        tracing::info!(sql = %sql, "Generated SQL");
        Ok(sql.to_string())
    }
}
