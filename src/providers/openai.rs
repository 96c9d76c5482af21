//! OpenAI provider implementation for Parlance
//!
//! Implements the Provider trait against the OpenAI chat completions API.
//! Each invocation performs a single POST with no retry; streaming is the
//! simulated word-by-word path from the trait default.

use crate::config::OpenAiConfig;
use crate::error::{ParlanceError, Result};
use crate::providers::{credential_is_usable, ChatTurn, Provider, SYSTEM_PROMPT};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API base for the OpenAI chat completions endpoint
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Request timeout; expiry surfaces as a transport error
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI API provider
///
/// # Examples
///
/// ```no_run
/// use parlance::config::OpenAiConfig;
/// use parlance::providers::{ChatTurn, OpenAiProvider, Provider};
///
/// # async fn example() -> parlance::error::Result<()> {
/// let config = OpenAiConfig {
///     api_key: "sk-live-example".to_string(),
///     ..Default::default()
/// };
/// let provider = OpenAiProvider::new(config)?;
/// let reply = provider.send_message(&[ChatTurn::user("Hello!")]).await?;
/// # Ok(())
/// # }
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
    chunk_delay: Duration,
}

/// Request body for POST /chat/completions
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
}

/// Message entry in the OpenAI wire format
#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

/// Response body from POST /chat/completions
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

/// A single completion choice
#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

/// Error envelope returned on non-success responses
#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    error: OpenAiErrorBody,
}

/// Backend error details
#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("parlance/0.3.0")
            .build()
            .map_err(|e| ParlanceError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized OpenAI provider: model={}", config.model);

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

    /// The chat completions endpoint, honoring an `api_base` override
    fn endpoint(&self) -> String {
        let base = self
            .config
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    /// Convert generic turns to the OpenAI wire shape, layering the system
    /// prompt as the first entry
    fn convert_turns(&self, turns: &[ChatTurn]) -> Vec<OpenAiMessage> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(OpenAiMessage {
            role: "system".to_string(),
            content: SYSTEM_PROMPT.to_string(),
        });
        messages.extend(turns.iter().map(|turn| OpenAiMessage {
            role: turn.role.to_string(),
            content: turn.content.clone(),
        }));
        messages
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn send_message(&self, turns: &[ChatTurn]) -> Result<String> {
        if !credential_is_usable(&self.config.api_key) {
            return Err(ParlanceError::Config(
                "OpenAI API key is missing or a placeholder".to_string(),
            )
            .into());
        }

        let request = OpenAiRequest {
            model: self.config.model.clone(),
            messages: self.convert_turns(turns),
        };

        let url = self.endpoint();
        tracing::debug!("Sending {} turns to OpenAI at {}", turns.len(), url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("OpenAI request failed: {}", e);
                ParlanceError::Transport(format!("OpenAI request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| ParlanceError::Transport(format!("Failed to read error body: {}", e)))?;
            let message = serde_json::from_str::<OpenAiErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            tracing::error!("OpenAI returned {}: {}", status, message);
            return Err(
                ParlanceError::Provider(format!("OpenAI returned {}: {}", status, message)).into(),
            );
        }

        let parsed: OpenAiResponse = response.json().await.map_err(|e| {
            ParlanceError::Provider(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                ParlanceError::Provider("OpenAI response contained no choices".to_string())
            })?;

        Ok(reply)
    }

    fn chunk_delay(&self) -> Duration {
        self.chunk_delay
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with_key(api_key: &str) -> OpenAiProvider {
        OpenAiProvider::new(OpenAiConfig {
            api_key: api_key.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_default_and_override() {
        let provider = provider_with_key("sk-test");
        assert_eq!(
            provider.endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );

        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: "sk-test".to_string(),
            api_base: Some("http://localhost:9999/".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:9999/chat/completions");
    }

    #[test]
    fn test_convert_turns_layers_system_prompt() {
        let provider = provider_with_key("sk-test");
        let turns = vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")];
        let messages = provider.convert_turns(&turns);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "hi");
        assert_eq!(messages[2].role, "assistant");
    }

    #[tokio::test]
    async fn test_missing_credential_fails_without_network() {
        let provider = provider_with_key("");
        let err = provider
            .send_message(&[ChatTurn::user("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }

    #[tokio::test]
    async fn test_placeholder_credential_fails_without_network() {
        let provider = provider_with_key("your-openai-api-key-here");
        let err = provider
            .send_message(&[ChatTurn::user("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Paris"}}]}"#;
        let parsed: OpenAiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Paris");
    }

    #[test]
    fn test_error_envelope_parsing() {
        let body = r#"{"error":{"message":"model not found","type":"invalid_request_error"}}"#;
        let envelope: OpenAiErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.error.message, "model not found");
    }
}
