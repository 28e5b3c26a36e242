//! Google Gemini Chat Completions API provider implementation.
//!
//! This provider uses the Google AI Studio OpenAI-compatible
//! chat completions API with API key authentication.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::GoogleConfig;
use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

const PROVIDER: &str = "google";

/// Google Gemini Chat Completions API provider.
pub struct GoogleGeminiProvider {
    client: Client,
    config: GoogleConfig,
}

impl GoogleGeminiProvider {
    /// Create a new Google Gemini provider with API key auth.
    pub fn new(config: GoogleConfig) -> Result<Self, LlmError> {
        if config.api_key.is_none() {
            return Err(LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn api_key(&self) -> String {
        self.config
            .api_key
            .as_ref()
            .map(|k| k.expose_secret().to_string())
            .unwrap_or_default()
    }

    /// Send a request to the chat completions API and return the raw body.
    async fn send_request<T: Serialize>(&self, body: &T) -> Result<String, LlmError> {
        let url = self.api_url("chat/completions");

        tracing::debug!("Sending request to Google Gemini: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key()))
            .header("x-goog-api-key", self.api_key())
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Google Gemini request failed: {}", e);
                LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let response_text = response.text().await.map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("failed to read body: {}", e),
        })?;

        tracing::debug!("Google Gemini response status: {}", status);
        tracing::trace!("Google Gemini response body: {}", response_text);

        if !status.is_success() {
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(LlmError::AuthFailed {
                    provider: PROVIDER.to_string(),
                });
            }
            if status.as_u16() == 429 {
                let retry_after = headers
                    .get("retry-after")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);

                return Err(LlmError::RateLimited {
                    provider: PROVIDER.to_string(),
                    retry_after,
                });
            }
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {}: {}", status, response_text),
            });
        }

        Ok(response_text)
    }
}

/// Decode a chat completions body into a [`CompletionResponse`].
///
/// A body without choices, or whose first choice carries no content, is an
/// `InvalidResponse`.
fn parse_completion(body: &str) -> Result<CompletionResponse, LlmError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("JSON parse error: {}. Raw: {}", e, body),
        })?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: "No choices in response".to_string(),
        })?;

    let content = choice
        .message
        .content
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: "No content in response".to_string(),
        })?;

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        _ => FinishReason::Unknown,
    };

    let usage = response.usage.unwrap_or_default();

    Ok(CompletionResponse {
        content,
        finish_reason,
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
    })
}

#[async_trait]
impl LlmProvider for GoogleGeminiProvider {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let messages: Vec<ChatCompletionMessage> =
            req.messages.into_iter().map(|m| m.into()).collect();

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
        };

        let body = self.send_request(&request).await?;
        let response = parse_completion(&body)?;

        tracing::debug!(
            model = %self.config.model,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Google Gemini completion finished ({:?})",
            response.finish_reason
        );

        Ok(response)
    }
}

// OpenAI-compatible Chat Completions API types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatCompletionMessage>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage {
    role: String,
    content: String,
}

impl From<ChatMessage> for ChatCompletionMessage {
    fn from(msg: ChatMessage) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
        };
        Self {
            role: role.to_string(),
            content: msg.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> GoogleConfig {
        GoogleConfig {
            api_key: api_key.map(secrecy::SecretString::from),
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://example.com/v1beta/openai/".to_string(),
        }
    }

    #[test]
    fn test_requires_api_key() {
        let result = GoogleGeminiProvider::new(config(None));
        assert!(matches!(result, Err(LlmError::AuthFailed { .. })));
    }

    #[test]
    fn test_api_url_joins_cleanly() {
        let provider = GoogleGeminiProvider::new(config(Some("key"))).unwrap();
        assert_eq!(
            provider.api_url("/chat/completions"),
            "https://example.com/v1beta/openai/chat/completions"
        );
    }

    #[test]
    fn test_request_body_carries_only_model_and_messages() {
        let request = ChatCompletionRequest {
            model: "gemini-2.0-flash".to_string(),
            messages: vec![
                ChatMessage::system("schema").into(),
                ChatMessage::user("How many tracks are there?").into(),
            ],
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "gemini-2.0-flash",
                "messages": [
                    {"role": "system", "content": "schema"},
                    {"role": "user", "content": "How many tracks are there?"}
                ]
            })
        );
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{
            "id": "abc",
            "choices": [{"message": {"role": "assistant", "content": "SELECT 1;"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let response = parse_completion(body).unwrap();
        assert_eq!(response.content, "SELECT 1;");
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.input_tokens, 12);
        assert_eq!(response.output_tokens, 3);
    }

    #[test]
    fn test_parse_completion_without_usage() {
        let body = r#"{"choices": [{"message": {"content": "hi"}, "finish_reason": null}]}"#;
        let response = parse_completion(body).unwrap();
        assert_eq!(response.content, "hi");
        assert_eq!(response.finish_reason, FinishReason::Unknown);
        assert_eq!(response.input_tokens, 0);
    }

    #[test]
    fn test_parse_completion_malformed() {
        let no_choices = parse_completion(r#"{"choices": []}"#);
        assert!(matches!(no_choices, Err(LlmError::InvalidResponse { .. })));

        let no_content =
            parse_completion(r#"{"choices": [{"message": {}, "finish_reason": "content_filter"}]}"#);
        assert!(matches!(no_content, Err(LlmError::InvalidResponse { .. })));

        let not_json = parse_completion("<html>oops</html>");
        assert!(matches!(not_json, Err(LlmError::InvalidResponse { .. })));
    }
}
