//! Error types for Parlance
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Parlance operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, provider interactions, streaming delivery,
/// and conversation persistence.
#[derive(Error, Debug)]
pub enum ParlanceError {
    /// Configuration-related errors (missing or placeholder credentials,
    /// invalid config files). Recoverable by user action, never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors: the backend accepted the connection but
    /// rejected the request. Carries the backend's own message.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Network-level failures (connect, timeout, body read)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Conversation storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Parlance operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
