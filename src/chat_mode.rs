//! Chat mode types and utilities
//!
//! This module defines the request classifications for a chat turn:
//! - Chat: plain conversation
//! - Web search: the model is instructed to answer with current information
//! - Deep research: the model is instructed to answer thoroughly with sources
//!
//! A mode alters both the displayed text (a visible marker prefix on the
//! stored user message) and the instruction sent upstream. The two strings
//! are deliberately distinct; see `composer`.

use colored::Colorize;
use std::fmt;

/// Marker prefix shown on stored web-search messages
pub const WEB_SEARCH_MARKER: &str = "\u{1F50D} ";

/// Marker prefix shown on stored deep-research messages
pub const DEEP_RESEARCH_MARKER: &str = "\u{1F4DA} ";

/// Request classification for a chat turn
///
/// Determines the display marker, the model-facing instruction rewrite, and
/// the canned guidance shown when no provider credential is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    /// Plain conversation, no rewriting
    #[default]
    Chat,

    /// Web search: answer with current information
    WebSearch,

    /// Deep research: answer thoroughly, citing sources
    DeepResearch,
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat => write!(f, "CHAT"),
            Self::WebSearch => write!(f, "WEB-SEARCH"),
            Self::DeepResearch => write!(f, "DEEP-RESEARCH"),
        }
    }
}

impl ChatMode {
    /// Parse a chat mode from a string
    ///
    /// # Arguments
    ///
    /// * `s` - String representation ("chat", "web-search", or "deep-research")
    ///
    /// # Returns
    ///
    /// Returns the parsed ChatMode or an error if the string is invalid
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::chat_mode::ChatMode;
    ///
    /// let mode = ChatMode::parse_str("web-search").unwrap();
    /// assert_eq!(mode, ChatMode::WebSearch);
    /// ```
    pub fn parse_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "web-search" | "websearch" | "search" => Ok(Self::WebSearch),
            "deep-research" | "deepresearch" | "research" => Ok(Self::DeepResearch),
            other => Err(format!("Unknown chat mode: {}", other)),
        }
    }

    /// The visible marker prefixed to the stored user message
    ///
    /// Empty for plain chat. The composer strips these markers from prior
    /// turns before building the outbound payload.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Chat => "",
            Self::WebSearch => WEB_SEARCH_MARKER,
            Self::DeepResearch => DEEP_RESEARCH_MARKER,
        }
    }

    /// The model-facing instruction for a user input in this mode
    ///
    /// This text replaces the stored display string in the outbound payload;
    /// it never carries the display marker.
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::chat_mode::ChatMode;
    ///
    /// assert_eq!(ChatMode::Chat.instruction("hi"), "hi");
    /// assert!(ChatMode::WebSearch.instruction("hi").contains("hi"));
    /// ```
    pub fn instruction(&self, input: &str) -> String {
        match self {
            Self::Chat => input.to_string(),
            Self::WebSearch => format!(
                "Search the web for current information and answer the following: {}",
                input
            ),
            Self::DeepResearch => format!(
                "Provide a thorough, well-researched answer with sources where possible: {}",
                input
            ),
        }
    }

    /// Canned guidance shown when no provider credential is configured
    ///
    /// Each mode has distinct text; all of it tells the user how to add an
    /// API key. This message is created already complete and is never marked
    /// as streaming.
    pub fn fallback_text(&self) -> &'static str {
        match self {
            Self::Chat => {
                "I'm not connected to an AI provider yet. Add an API key for OpenAI, \
                 Gemini, or Claude to your config file (or set PARLANCE_OPENAI_API_KEY, \
                 PARLANCE_GEMINI_API_KEY, or PARLANCE_CLAUDE_API_KEY) and I'll be able \
                 to answer your questions."
            }
            Self::WebSearch => {
                "Web search needs a configured AI provider. Add an API key for OpenAI, \
                 Gemini, or Claude to your config file and I'll be able to search for \
                 current information."
            }
            Self::DeepResearch => {
                "Deep research needs a configured AI provider. Add an API key for \
                 OpenAI, Gemini, or Claude to your config file and I'll be able to \
                 put together a thorough, sourced answer."
            }
        }
    }

    /// Get a colored tag representation of this mode
    ///
    /// # Returns
    ///
    /// A colored string suitable for display in terminal output
    pub fn colored_tag(&self) -> String {
        match self {
            Self::Chat => format!("[{}]", "CHAT".green()),
            Self::WebSearch => format!("[{}]", "WEB-SEARCH".blue()),
            Self::DeepResearch => format!("[{}]", "DEEP-RESEARCH".purple()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_str_valid() {
        assert_eq!(ChatMode::parse_str("chat").unwrap(), ChatMode::Chat);
        assert_eq!(ChatMode::parse_str("web-search").unwrap(), ChatMode::WebSearch);
        assert_eq!(ChatMode::parse_str("search").unwrap(), ChatMode::WebSearch);
        assert_eq!(
            ChatMode::parse_str("deep-research").unwrap(),
            ChatMode::DeepResearch
        );
        assert_eq!(ChatMode::parse_str("RESEARCH").unwrap(), ChatMode::DeepResearch);
    }

    #[test]
    fn test_parse_str_invalid() {
        let err = ChatMode::parse_str("turbo").unwrap_err();
        assert!(err.contains("Unknown chat mode"));
    }

    #[test]
    fn test_display() {
        assert_eq!(ChatMode::Chat.to_string(), "CHAT");
        assert_eq!(ChatMode::WebSearch.to_string(), "WEB-SEARCH");
        assert_eq!(ChatMode::DeepResearch.to_string(), "DEEP-RESEARCH");
    }

    #[test]
    fn test_markers() {
        assert_eq!(ChatMode::Chat.marker(), "");
        assert_eq!(ChatMode::WebSearch.marker(), WEB_SEARCH_MARKER);
        assert_eq!(ChatMode::DeepResearch.marker(), DEEP_RESEARCH_MARKER);
        assert_ne!(WEB_SEARCH_MARKER, DEEP_RESEARCH_MARKER);
    }

    #[test]
    fn test_instruction_chat_is_identity() {
        assert_eq!(ChatMode::Chat.instruction("capital of France"), "capital of France");
    }

    #[test]
    fn test_instruction_contains_input_and_no_marker() {
        for mode in [ChatMode::WebSearch, ChatMode::DeepResearch] {
            let instruction = mode.instruction("capital of France");
            assert!(instruction.contains("capital of France"));
            assert!(!instruction.contains(mode.marker()));
        }
    }

    #[test]
    fn test_fallback_text_distinct_per_mode() {
        let chat = ChatMode::Chat.fallback_text();
        let search = ChatMode::WebSearch.fallback_text();
        let research = ChatMode::DeepResearch.fallback_text();
        assert_ne!(chat, search);
        assert_ne!(chat, research);
        assert_ne!(search, research);
        for text in [chat, search, research] {
            assert!(text.contains("API key"));
        }
    }

    #[test]
    fn test_default_mode() {
        assert_eq!(ChatMode::default(), ChatMode::Chat);
    }
}
