//! Configuration management for Parlance
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files and environment variables.
//!
//! The configuration is constructed exactly once at process start and passed
//! into the provider factory by value; business logic never reads the
//! process environment directly.

use crate::error::{ParlanceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Parlance
///
/// Holds the provider selection with per-backend credentials and the chat
/// delivery tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider configuration (OpenAI, Gemini, Claude)
    pub provider: ProviderConfig,
    /// Chat delivery configuration
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Provider configuration
///
/// Specifies which AI provider to use and its settings. The credential for
/// the selected provider decides whether the orchestrator runs against a
/// live adapter or falls back to canned guidance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use ("openai", "gemini", or "claude")
    #[serde(rename = "type")]
    pub provider_type: String,

    /// OpenAI configuration
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Gemini configuration
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Claude configuration
    #[serde(default)]
    pub claude: ClaudeConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: "openai".to_string(),
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
            claude: ClaudeConfig::default(),
        }
    }
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key for the OpenAI API
    #[serde(default)]
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Optional API base URL (useful for tests and local mocks)
    ///
    /// When set, this base is used to build the chat completions endpoint,
    /// which allows tests to point the adapter at a mock server.
    #[serde(default)]
    pub api_base: Option<String>,
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_openai_model(),
            api_base: None,
        }
    }
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key for the Gemini API
    #[serde(default)]
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Optional API base URL (useful for tests and local mocks)
    #[serde(default)]
    pub api_base: Option<String>,
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_gemini_model(),
            api_base: None,
        }
    }
}

/// Claude provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeConfig {
    /// API key for the Anthropic API
    #[serde(default)]
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_claude_model")]
    pub model: String,

    /// Optional API base URL (useful for tests and local mocks)
    #[serde(default)]
    pub api_base: Option<String>,
}

fn default_claude_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_claude_model(),
            api_base: None,
        }
    }
}

/// Chat delivery configuration
///
/// Tuning for the simulated streaming path and the unconfigured-provider
/// fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Delay between simulated chunks, in milliseconds
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    /// Delay before the canned fallback message appears, in milliseconds
    #[serde(default = "default_fallback_delay_ms")]
    pub fallback_delay_ms: u64,
}

fn default_chunk_delay_ms() -> u64 {
    30
}

fn default_fallback_delay_ms() -> u64 {
    600
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            chunk_delay_ms: default_chunk_delay_ms(),
            fallback_delay_ms: default_fallback_delay_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file with environment overrides
    ///
    /// If the file does not exist, defaults are used. Environment variables
    /// are applied after the file is parsed:
    ///
    /// - `PARLANCE_PROVIDER` overrides `provider.type`
    /// - `PARLANCE_OPENAI_API_KEY` overrides `provider.openai.api_key`
    /// - `PARLANCE_GEMINI_API_KEY` overrides `provider.gemini.api_key`
    /// - `PARLANCE_CLAUDE_API_KEY` overrides `provider.claude.api_key`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ParlanceError::Config(format!("Failed to read {:?}: {}", path, e)))?;
            serde_yaml::from_str(&contents)
                .map_err(|e| ParlanceError::Config(format!("Failed to parse {:?}: {}", path, e)))?
        } else {
            tracing::debug!("Config file {:?} not found, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to this configuration
    ///
    /// This is the single place the process environment is consulted.
    fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("PARLANCE_PROVIDER") {
            self.provider.provider_type = provider;
        }
        if let Ok(key) = std::env::var("PARLANCE_OPENAI_API_KEY") {
            self.provider.openai.api_key = key;
        }
        if let Ok(key) = std::env::var("PARLANCE_GEMINI_API_KEY") {
            self.provider.gemini.api_key = key;
        }
        if let Ok(key) = std::env::var("PARLANCE_CLAUDE_API_KEY") {
            self.provider.claude.api_key = key;
        }
    }

    /// Validate the configuration
    ///
    /// Checks that the selected provider type is known and the delay knobs
    /// are sane. A missing credential is not a validation error: it selects
    /// the fallback path instead.
    ///
    /// # Errors
    ///
    /// Returns `ParlanceError::Config` for an unknown provider type
    pub fn validate(&self) -> Result<()> {
        match self.provider.provider_type.as_str() {
            "openai" | "gemini" | "claude" => {}
            other => {
                return Err(ParlanceError::Config(format!(
                    "Unknown provider type: {} (expected openai, gemini, or claude)",
                    other
                ))
                .into());
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.provider_type, "openai");
        assert_eq!(config.provider.openai.model, "gpt-4o-mini");
        assert_eq!(config.provider.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.provider.claude.model, "claude-3-5-haiku-latest");
        assert_eq!(config.chat.chunk_delay_ms, 30);
        assert_eq!(config.chat.fallback_delay_ms, 600);
    }

    #[test]
    fn test_validate_known_providers() {
        for provider in ["openai", "gemini", "claude"] {
            let mut config = Config::default();
            config.provider.provider_type = provider.to_string();
            assert!(config.validate().is_ok(), "provider {} should validate", provider);
        }
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = Config::default();
        config.provider.provider_type = "llamacloud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown provider type"));
    }

    #[test]
    fn test_parse_yaml_with_defaults() {
        let yaml = r#"
provider:
  type: claude
  claude:
    api_key: sk-ant-test
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.provider_type, "claude");
        assert_eq!(config.provider.claude.api_key, "sk-ant-test");
        // Unspecified sections fall back to defaults
        assert_eq!(config.provider.claude.model, "claude-3-5-haiku-latest");
        assert_eq!(config.provider.openai.api_key, "");
        assert_eq!(config.chat.chunk_delay_ms, 30);
    }

    #[test]
    fn test_parse_chat_overrides() {
        let yaml = r#"
provider:
  type: openai
chat:
  chunk_delay_ms: 5
  fallback_delay_ms: 100
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.chat.chunk_delay_ms, 5);
        assert_eq!(config.chat.fallback_delay_ms, 100);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/parlance-config.yaml").unwrap();
        assert_eq!(config.provider.provider_type, "openai");
    }

    #[test]
    fn test_config_roundtrip_serialization() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.provider.provider_type, config.provider.provider_type);
        assert_eq!(parsed.chat.chunk_delay_ms, config.chat.chunk_delay_ms);
    }
}
