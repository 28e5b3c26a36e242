//! Plain-language summaries of query results.

use std::sync::Arc;

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::present::render_indexed;
use crate::query::QueryResult;
use crate::query::schema::{SUMMARY_FALLBACK, summary_prompt};

/// Explains a result to a non-technical reader with one model call.
pub struct SummaryGenerator {
    llm: Arc<dyn LlmProvider>,
    sample_rows: usize,
}

impl SummaryGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, sample_rows: usize) -> Self {
        Self { llm, sample_rows }
    }

    /// Summarize `result` for `question`.
    ///
    /// Only the first `sample_rows` rows are shown to the model. A malformed
    /// response yields [`SUMMARY_FALLBACK`]; transport failures are returned.
    pub async fn summarize(
        &self,
        question: &str,
        sql: &str,
        result: &QueryResult,
    ) -> Result<String, LlmError> {
        let sample = render_indexed(&result.head(self.sample_rows));
        let prompt = summary_prompt(question, sql, &sample);
        let request = CompletionRequest::new(vec![ChatMessage::user(prompt)]);

        match self.llm.complete(request).await {
            Ok(response) => {
                let summary = response.content.trim();
                if summary.is_empty() {
                    tracing::warn!("Summary response was empty, using fallback");
                    return Ok(SUMMARY_FALLBACK.to_string());
                }
                Ok(summary.to_string())
            }
            Err(e) if e.is_malformed_response() => {
                tracing::warn!("Summary response malformed, using fallback: {}", e);
                Ok(SUMMARY_FALLBACK.to_string())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;

    fn tracks(n: usize) -> QueryResult {
        QueryResult::new(
            vec!["Name".to_string()],
            (0..n).map(|i| vec![Some(format!("Track {}", i))]).collect(),
        )
    }

    #[tokio::test]
    async fn test_summary_uses_model_text() {
        let llm = Arc::new(ScriptedLlm::new().reply("There are 3503 tracks.\n"));
        let summarizer = SummaryGenerator::new(llm.clone(), 10);

        let summary = summarizer
            .summarize("How many tracks?", "SELECT COUNT(*) FROM Track", &tracks(1))
            .await
            .unwrap();
        assert_eq!(summary, "There are 3503 tracks.");
        assert_eq!(llm.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_summary_sample_is_truncated() {
        let llm = Arc::new(ScriptedLlm::new().reply("ok"));
        let summarizer = SummaryGenerator::new(llm.clone(), 10);

        summarizer
            .summarize("List tracks", "SELECT Name FROM Track", &tracks(50))
            .await
            .unwrap();

        let prompt = &llm.requests()[0].messages[0].content;
        assert!(prompt.contains("Track 9"));
        assert!(!prompt.contains("Track 10"));
    }

    #[tokio::test]
    async fn test_malformed_response_returns_fallback() {
        let llm = Arc::new(ScriptedLlm::new().fail_malformed());
        let summarizer = SummaryGenerator::new(llm, 10);
        let summary = summarizer.summarize("q", "SELECT 1", &tracks(1)).await.unwrap();
        assert_eq!(
            summary,
            "Unable to generate summary due to an error in response format."
        );

        let llm = Arc::new(ScriptedLlm::new().reply(""));
        let summarizer = SummaryGenerator::new(llm, 10);
        let summary = summarizer.summarize("q", "SELECT 1", &tracks(1)).await.unwrap();
        assert_eq!(summary, SUMMARY_FALLBACK);
    }

    #[tokio::test]
    async fn test_unreachable_model_is_an_error() {
        let llm = Arc::new(ScriptedLlm::new().fail_unreachable());
        let summarizer = SummaryGenerator::new(llm, 10);
        let result = summarizer.summarize("q", "SELECT 1", &tracks(1)).await;
        assert!(matches!(result, Err(LlmError::RequestFailed { .. })));
    }
}
