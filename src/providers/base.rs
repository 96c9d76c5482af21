//! Base provider trait and common types for Parlance
//!
//! This module defines the Provider trait that all text-generation backends
//! implement, along with the generic role/content turn shape adapters
//! translate into their own wire formats.

use crate::conversation::Role;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay between simulated stream chunks
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(30);

/// A single role/content pair in an outbound provider payload
///
/// Only user and assistant roles appear here; if a backend wants a system
/// prompt the adapter layers it in internally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Role of the turn
    pub role: Role,
    /// Model-facing text (never carries display markers)
    pub content: String,
}

impl ChatTurn {
    /// Creates a user turn
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::conversation::Role;
    /// use parlance::providers::ChatTurn;
    ///
    /// let turn = ChatTurn::user("Hello!");
    /// assert_eq!(turn.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Provider trait for text-generation backends
///
/// All adapters (OpenAI, Gemini, Claude) implement this trait. Each
/// invocation performs exactly one outbound network call with no internal
/// retry.
///
/// # Streaming contract
///
/// `stream_message` invokes the callback one or more times with
/// non-overlapping substrings that concatenate, in emission order, to
/// exactly the string it returns. The default implementation simulates
/// streaming over the full `send_message` reply because the underlying
/// transports here cannot push partial tokens; a backend with true
/// incremental delivery may override it and forward real chunks under the
/// identical external contract.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Produces the complete assistant reply for the given turns
    ///
    /// # Arguments
    ///
    /// * `turns` - Ordered, non-empty role/content list
    ///
    /// # Errors
    ///
    /// - `ParlanceError::Config` when the credential is absent or a placeholder
    /// - `ParlanceError::Provider` on a non-success backend response
    /// - `ParlanceError::Transport` on network failure
    async fn send_message(&self, turns: &[ChatTurn]) -> Result<String>;

    /// Streams the assistant reply chunk by chunk, returning the full text
    ///
    /// The default implementation obtains the full reply via
    /// [`send_message`](Provider::send_message), then re-emits it word by
    /// word: the text is split on single spaces and each non-first word is
    /// prefixed with one separating space, so the emitted chunks concatenate
    /// back to the returned string byte for byte. A fixed short delay
    /// ([`chunk_delay`](Provider::chunk_delay)) between emissions produces
    /// the user-visible typing effect.
    async fn stream_message(
        &self,
        turns: &[ChatTurn],
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String> {
        let full = self.send_message(turns).await?;
        let delay = self.chunk_delay();

        for (index, word) in full.split(' ').enumerate() {
            if index == 0 {
                on_chunk(word);
            } else {
                let chunk = format!(" {}", word);
                on_chunk(&chunk);
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(full)
    }

    /// Delay inserted between simulated stream chunks
    ///
    /// Adapters forward the configured value; test doubles override this to
    /// zero to keep suites fast.
    fn chunk_delay(&self) -> Duration {
        DEFAULT_CHUNK_DELAY
    }

    /// Human-readable backend name, used in logs
    fn name(&self) -> &'static str;
}

/// Returns true when a credential is present and not a known placeholder
///
/// Placeholder values come from config templates that ship literal strings
/// like `your-api-key-here`; treating them as configured would send garbage
/// credentials upstream.
///
/// # Examples
///
/// ```
/// use parlance::providers::credential_is_usable;
///
/// assert!(credential_is_usable("sk-live-abc123"));
/// assert!(!credential_is_usable(""));
/// assert!(!credential_is_usable("your-api-key-here"));
/// ```
pub fn credential_is_usable(api_key: &str) -> bool {
    let key = api_key.trim();
    if key.is_empty() {
        return false;
    }
    let lowered = key.to_lowercase();
    const PLACEHOLDERS: [&str; 4] = ["your-api-key-here", "changeme", "todo", "xxx"];
    if PLACEHOLDERS.contains(&lowered.as_str()) {
        return false;
    }
    // Template keys like "your-openai-api-key-here"
    !(lowered.starts_with("your-") && lowered.ends_with("-here"))
}
