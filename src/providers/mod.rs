//! AI provider abstraction and implementations
//!
//! This module defines the Provider trait and the three concrete adapters
//! (OpenAI, Gemini, Claude), plus the factory that selects one of them from
//! configuration. Provider selection is a closed enum, so an unhandled
//! backend is a compile error rather than a missing table entry.

mod base;
mod claude;
mod gemini;
mod openai;

pub use base::{credential_is_usable, ChatTurn, Provider, DEFAULT_CHUNK_DELAY};
pub use claude::ClaudeProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use crate::config::{ChatConfig, ProviderConfig};
use crate::error::{ParlanceError, Result};
use std::fmt;
use std::time::Duration;

/// System prompt layered in by every adapter
///
/// The abstracted turn list only carries user and assistant roles; each
/// backend attaches this in its own way (OpenAI as a system message, Claude
/// as a top-level field, Gemini as a systemInstruction).
pub const SYSTEM_PROMPT: &str = "You are a helpful, concise AI assistant. \
    Answer clearly and directly, and ask a clarifying question when the \
    request is ambiguous.";

/// The closed set of supported text-generation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI chat completions
    OpenAi,
    /// Google Gemini generateContent
    Gemini,
    /// Anthropic messages
    Claude,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
            Self::Claude => write!(f, "claude"),
        }
    }
}

impl ProviderKind {
    /// Parse a provider kind from its configuration name
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::providers::ProviderKind;
    ///
    /// assert_eq!(ProviderKind::parse_str("claude").unwrap(), ProviderKind::Claude);
    /// assert!(ProviderKind::parse_str("copilot").is_err());
    /// ```
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            "claude" => Ok(Self::Claude),
            other => Err(ParlanceError::Config(format!(
                "Unknown provider type: {} (expected openai, gemini, or claude)",
                other
            ))
            .into()),
        }
    }
}

/// Build the configured provider adapter, if one is usable
///
/// Returns `Ok(None)` when the selected backend has no usable credential:
/// the orchestrator then takes the canned-fallback path without touching the
/// network. Returns an error for an unknown provider name.
///
/// # Arguments
///
/// * `config` - Provider selection and per-backend settings
/// * `chat` - Delivery tuning (the simulated-chunk delay is forwarded here)
///
/// # Examples
///
/// ```
/// use parlance::config::{ChatConfig, ProviderConfig};
/// use parlance::providers::create_provider;
///
/// // No credential configured: no adapter, fallback path
/// let provider = create_provider(&ProviderConfig::default(), &ChatConfig::default()).unwrap();
/// assert!(provider.is_none());
/// ```
pub fn create_provider(
    config: &ProviderConfig,
    chat: &ChatConfig,
) -> Result<Option<Box<dyn Provider>>> {
    let kind = ProviderKind::parse_str(&config.provider_type)?;
    let chunk_delay = Duration::from_millis(chat.chunk_delay_ms);

    let provider: Option<Box<dyn Provider>> = match kind {
        ProviderKind::OpenAi => {
            if credential_is_usable(&config.openai.api_key) {
                Some(Box::new(
                    OpenAiProvider::new(config.openai.clone())?.with_chunk_delay(chunk_delay),
                ))
            } else {
                None
            }
        }
        ProviderKind::Gemini => {
            if credential_is_usable(&config.gemini.api_key) {
                Some(Box::new(
                    GeminiProvider::new(config.gemini.clone())?.with_chunk_delay(chunk_delay),
                ))
            } else {
                None
            }
        }
        ProviderKind::Claude => {
            if credential_is_usable(&config.claude.api_key) {
                Some(Box::new(
                    ClaudeProvider::new(config.claude.clone())?.with_chunk_delay(chunk_delay),
                ))
            } else {
                None
            }
        }
    };

    match &provider {
        Some(p) => tracing::info!("Selected provider: {}", p.name()),
        None => tracing::warn!(
            "Provider {} has no usable credential; canned fallback replies will be used",
            kind
        ),
    }

    Ok(provider)
}
