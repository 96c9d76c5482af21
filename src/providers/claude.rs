//! Claude provider implementation for Parlance
//!
//! Implements the Provider trait against the Anthropic messages API. The
//! system prompt rides in a top-level field rather than as a message, and
//! authentication uses the `x-api-key` header plus a pinned API version.

use crate::config::ClaudeConfig;
use crate::error::{ParlanceError, Result};
use crate::providers::{credential_is_usable, ChatTurn, Provider, SYSTEM_PROMPT};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API base for the Anthropic messages endpoint
const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// Pinned Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Upper bound on reply length requested from the backend
const MAX_TOKENS: u32 = 1024;

/// Request timeout; expiry surfaces as a transport error
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Claude API provider
pub struct ClaudeProvider {
    client: Client,
    config: ClaudeConfig,
    chunk_delay: Duration,
}

/// Request body for POST /v1/messages
#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ClaudeMessage>,
}

/// Message entry in the Anthropic wire format
#[derive(Debug, Serialize, Deserialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

/// Response body from POST /v1/messages
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContentBlock>,
}

/// A single content block in the reply
#[derive(Debug, Deserialize)]
struct ClaudeContentBlock {
    #[serde(default)]
    text: String,
}

/// Error envelope returned on non-success responses
#[derive(Debug, Deserialize)]
struct ClaudeErrorEnvelope {
    error: ClaudeErrorBody,
}

/// Backend error details
#[derive(Debug, Deserialize)]
struct ClaudeErrorBody {
    message: String,
}

impl ClaudeProvider {
    /// Create a new Claude provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: ClaudeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("parlance/0.3.0")
            .build()
            .map_err(|e| ParlanceError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized Claude provider: model={}", config.model);

        Ok(Self {
            client,
            config,
            chunk_delay: crate::providers::DEFAULT_CHUNK_DELAY,
        })
    }

    /// Set the delay between simulated stream chunks
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// The messages endpoint, honoring an `api_base` override
    fn endpoint(&self) -> String {
        let base = self
            .config
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');
        format!("{}/v1/messages", base)
    }

    /// Convert generic turns to the Anthropic wire shape
    fn convert_turns(&self, turns: &[ChatTurn]) -> Vec<ClaudeMessage> {
        turns
            .iter()
            .map(|turn| ClaudeMessage {
                role: turn.role.to_string(),
                content: turn.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl Provider for ClaudeProvider {
    async fn send_message(&self, turns: &[ChatTurn]) -> Result<String> {
        if !credential_is_usable(&self.config.api_key) {
            return Err(ParlanceError::Config(
                "Claude API key is missing or a placeholder".to_string(),
            )
            .into());
        }

        let request = ClaudeRequest {
            model: self.config.model.clone(),
            max_tokens: MAX_TOKENS,
            system: SYSTEM_PROMPT.to_string(),
            messages: self.convert_turns(turns),
        };

        tracing::debug!("Sending {} turns to Claude", turns.len());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Claude request failed: {}", e);
                ParlanceError::Transport(format!("Claude request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| ParlanceError::Transport(format!("Failed to read error body: {}", e)))?;
            let message = serde_json::from_str::<ClaudeErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            tracing::error!("Claude returned {}: {}", status, message);
            return Err(
                ParlanceError::Provider(format!("Claude returned {}: {}", status, message)).into(),
            );
        }

        let parsed: ClaudeResponse = response.json().await.map_err(|e| {
            ParlanceError::Provider(format!("Failed to parse Claude response: {}", e))
        })?;

        let reply: String = parsed
            .content
            .into_iter()
            .map(|block| block.text)
            .collect();

        if reply.is_empty() {
            return Err(
                ParlanceError::Provider("Claude response contained no text".to_string()).into(),
            );
        }

        Ok(reply)
    }

    fn chunk_delay(&self) -> Duration {
        self.chunk_delay
    }

    fn name(&self) -> &'static str {
        "claude"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with_key(api_key: &str) -> ClaudeProvider {
        ClaudeProvider::new(ClaudeConfig {
            api_key: api_key.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_default_and_override() {
        let provider = provider_with_key("sk-ant-test");
        assert_eq!(provider.endpoint(), "https://api.anthropic.com/v1/messages");

        let provider = ClaudeProvider::new(ClaudeConfig {
            api_key: "sk-ant-test".to_string(),
            api_base: Some("http://localhost:9999".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:9999/v1/messages");
    }

    #[test]
    fn test_convert_turns_preserves_roles() {
        let provider = provider_with_key("sk-ant-test");
        let turns = vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")];
        let messages = provider.convert_turns(&turns);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
    }

    #[tokio::test]
    async fn test_missing_credential_fails_without_network() {
        let provider = provider_with_key("your-claude-api-key-here");
        let err = provider
            .send_message(&[ChatTurn::user("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_response_parsing_joins_text_blocks() {
        let body = r#"{"content":[{"type":"text","text":"Par"},{"type":"text","text":"is"}]}"#;
        let parsed: ClaudeResponse = serde_json::from_str(body).unwrap();
        let text: String = parsed.content.iter().map(|b| b.text.clone()).collect();
        assert_eq!(text, "Paris");
    }

    #[test]
    fn test_error_envelope_parsing() {
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        let envelope: ClaudeErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.error.message, "invalid x-api-key");
    }
}
