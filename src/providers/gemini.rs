//! Gemini provider implementation for Parlance
//!
//! Implements the Provider trait against the Google Gemini generateContent
//! API. Gemini names the assistant role "model" and carries text inside
//! content parts, so the conversion layer here is a little thicker than the
//! OpenAI one.

use crate::config::GeminiConfig;
use crate::conversation::Role;
use crate::error::{ParlanceError, Result};
use crate::providers::{credential_is_usable, ChatTurn, Provider, SYSTEM_PROMPT};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API base for the Gemini REST endpoint
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Request timeout; expiry surfaces as a transport error
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Gemini API provider
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
    chunk_delay: Duration,
}

/// Request body for models/{model}:generateContent
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction")]
    system_instruction: GeminiContentBody,
}

/// A role-tagged content entry
#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

/// Role-less content body (system instruction, candidate content)
#[derive(Debug, Serialize, Deserialize)]
struct GeminiContentBody {
    parts: Vec<GeminiPart>,
}

/// A single text part
#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

/// Response body from generateContent
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

/// A single candidate reply
#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContentBody,
}

/// Error envelope returned on non-success responses
#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

/// Backend error details
#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("parlance/0.3.0")
            .build()
            .map_err(|e| ParlanceError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized Gemini provider: model={}", config.model);

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

    /// The generateContent endpoint for the configured model
    ///
    /// The API key travels as a query parameter, per the Gemini REST
    /// convention.
    fn endpoint(&self) -> String {
        let base = self
            .config
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');
        format!(
            "{}/models/{}:generateContent?key={}",
            base, self.config.model, self.config.api_key
        )
    }

    /// Convert generic turns to Gemini contents ("assistant" becomes "model")
    fn convert_turns(&self, turns: &[ChatTurn]) -> Vec<GeminiContent> {
        turns
            .iter()
            .map(|turn| GeminiContent {
                role: match turn.role {
                    Role::User => "user".to_string(),
                    Role::Assistant => "model".to_string(),
                },
                parts: vec![GeminiPart {
                    text: turn.content.clone(),
                }],
            })
            .collect()
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn send_message(&self, turns: &[ChatTurn]) -> Result<String> {
        if !credential_is_usable(&self.config.api_key) {
            return Err(ParlanceError::Config(
                "Gemini API key is missing or a placeholder".to_string(),
            )
            .into());
        }

        let request = GeminiRequest {
            contents: self.convert_turns(turns),
            system_instruction: GeminiContentBody {
                parts: vec![GeminiPart {
                    text: SYSTEM_PROMPT.to_string(),
                }],
            },
        };

        tracing::debug!("Sending {} turns to Gemini", turns.len());

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Gemini request failed: {}", e);
                ParlanceError::Transport(format!("Gemini request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| ParlanceError::Transport(format!("Failed to read error body: {}", e)))?;
            let message = serde_json::from_str::<GeminiErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            tracing::error!("Gemini returned {}: {}", status, message);
            return Err(
                ParlanceError::Provider(format!("Gemini returned {}: {}", status, message)).into(),
            );
        }

        let parsed: GeminiResponse = response.json().await.map_err(|e| {
            ParlanceError::Provider(format!("Failed to parse Gemini response: {}", e))
        })?;

        let reply = parsed
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .ok_or_else(|| {
                ParlanceError::Provider("Gemini response contained no candidates".to_string())
            })?;

        Ok(reply)
    }

    fn chunk_delay(&self) -> Duration {
        self.chunk_delay
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
