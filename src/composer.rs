//! Mode/context composition
//!
//! Pure transformation from stored conversation state plus a new user input
//! into (a) the display string to store and (b) the outbound role/content
//! payload for the provider adapter.
//!
//! The two strings are deliberately different: the stored message carries a
//! visible mode marker for display, while the outbound payload carries the
//! mode's instruction text with no marker, and markers are stripped from
//! prior turns so the model never sees display-only decoration.

use crate::chat_mode::ChatMode;
use crate::conversation::{strip_mode_marker, ChatMessage, Role};
use crate::providers::ChatTurn;

/// Result of composing one user turn
#[derive(Debug, Clone)]
pub struct ComposedTurn {
    /// Marker-prefixed text to store and display
    pub display_text: String,
    /// Full role/content payload for the provider, ending with the
    /// instruction-augmented form of the new input
    pub outbound: Vec<ChatTurn>,
}

/// Composes the stored display string and outbound payload for a user input
///
/// # Arguments
///
/// * `history` - Stored messages prior to this turn
/// * `input` - The raw text the user typed
/// * `mode` - Request classification for this turn
///
/// # Examples
///
/// ```
/// use parlance::chat_mode::ChatMode;
/// use parlance::composer::compose;
///
/// let composed = compose(&[], "capital of France", ChatMode::WebSearch);
/// assert!(composed.display_text.starts_with(ChatMode::WebSearch.marker()));
/// assert!(!composed.outbound.last().unwrap().content.contains(ChatMode::WebSearch.marker()));
/// ```
pub fn compose(history: &[ChatMessage], input: &str, mode: ChatMode) -> ComposedTurn {
    let display_text = format!("{}{}", mode.marker(), input);

    let mut outbound: Vec<ChatTurn> = history
        .iter()
        .filter(|message| !message.content.is_empty())
        .map(|message| {
            let content = strip_mode_marker(&message.content).to_string();
            match message.role {
                Role::User => ChatTurn::user(content),
                Role::Assistant => ChatTurn::assistant(content),
            }
        })
        .collect();

    outbound.push(ChatTurn::user(mode.instruction(input)));

    ComposedTurn {
        display_text,
        outbound,
    }
}
