//! Conversation lifecycle management
//!
//! This module owns the ordered message list for a chat session: it assigns
//! identifiers and timestamps, appends user and assistant turns, tracks the
//! single in-progress streaming message, and finalizes it.
//!
//! Invariants maintained here:
//! - at most one message has `is_streaming = true` at any time
//! - streaming content only grows (chunks are appended, never replaced)
//! - once a message is finalized it never becomes streaming again
//! - message ids are unique within a conversation

use crate::chat_mode::{DEEP_RESEARCH_MARKER, WEB_SEARCH_MARKER};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder title for a conversation with no user messages yet
pub const DEFAULT_TITLE: &str = "New Chat";

/// Maximum character length of a derived title before truncation
const TITLE_MAX_CHARS: usize = 48;

/// Role of a message sender
///
/// The stored conversation only ever contains user and assistant turns; a
/// system role may be layered in by a provider adapter internally but never
/// appears here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A message typed by the end user
    User,
    /// A message produced by the AI assistant
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single turn in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Opaque unique identifier, assigned at creation
    pub id: String,
    /// Role of the message sender
    pub role: Role,
    /// Message text; starts empty for an in-progress assistant message and
    /// grows via chunk appends
    pub content: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// True while content is still being appended
    #[serde(default)]
    pub is_streaming: bool,
    /// Opaque attachment references (local URIs), immutable once attached
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl ChatMessage {
    /// Creates a completed user message
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::conversation::{ChatMessage, Role};
    ///
    /// let msg = ChatMessage::user("Hello", Vec::new());
    /// assert_eq!(msg.role, Role::User);
    /// assert!(!msg.is_streaming);
    /// ```
    pub fn user(content: impl Into<String>, attachments: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            is_streaming: false,
            attachments,
        }
    }

    /// Creates a completed assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            is_streaming: false,
            attachments: Vec::new(),
        }
    }

    /// Creates an empty assistant message in the streaming state
    fn assistant_streaming() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            is_streaming: true,
            attachments: Vec::new(),
        }
    }
}

/// A chat session: an ordered message list with identity and timestamps
///
/// The conversation is only ever mutated from the single UI task; there is
/// no parallel mutation path and therefore no locking here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier for the conversation
    pub id: String,
    /// User-friendly title, derived from the first user message
    pub title: String,
    messages: Vec<ChatMessage>,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
    /// When the message list last changed
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates a new empty conversation
    ///
    /// # Arguments
    ///
    /// * `id` - Conversation identifier, usually from
    ///   [`ConversationStore::create_id`](crate::storage::ConversationStore::create_id)
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::conversation::Conversation;
    ///
    /// let conversation = Conversation::new("conv-1");
    /// assert!(conversation.is_empty());
    /// assert_eq!(conversation.title, "New Chat");
    /// ```
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reassembles a conversation from persisted parts
    ///
    /// Used by storage backends when loading a record whose message list is
    /// stored separately from its metadata.
    pub fn from_parts(
        id: impl Into<String>,
        title: impl Into<String>,
        messages: Vec<ChatMessage>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            messages,
            created_at,
            updated_at,
        }
    }

    /// Returns a reference to all messages in the conversation
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the number of messages in the conversation
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the conversation has no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends a completed user message and returns its id
    ///
    /// # Arguments
    ///
    /// * `content` - The display text to store (may carry a mode marker)
    /// * `attachments` - Opaque attachment references, immutable afterwards
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::conversation::{Conversation, Role};
    ///
    /// let mut conversation = Conversation::new("conv-1");
    /// conversation.append_user_message("Hello", Vec::new());
    /// assert_eq!(conversation.messages()[0].role, Role::User);
    /// ```
    pub fn append_user_message(
        &mut self,
        content: impl Into<String>,
        attachments: Vec<String>,
    ) -> String {
        let message = ChatMessage::user(content, attachments);
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// Appends an already-complete assistant message and returns its id
    ///
    /// Used for the unconfigured-provider fallback and for synthetic error
    /// messages; the message is never in the streaming state.
    pub fn append_completed_assistant_message(&mut self, content: impl Into<String>) -> String {
        let message = ChatMessage::assistant(content);
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// Begins a new streaming assistant message and returns its id
    ///
    /// The message starts with empty content and `is_streaming = true`. Any
    /// previously streaming message is finalized first so the single-streamer
    /// invariant holds even if a caller misbehaves.
    pub fn begin_assistant_message(&mut self) -> String {
        if let Some(existing) = self.streaming_message_id() {
            tracing::warn!(
                "Beginning a new assistant message while {} is still streaming; finalizing it",
                existing
            );
            self.finalize_assistant_message(&existing);
        }
        let message = ChatMessage::assistant_streaming();
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// Appends a chunk to the streaming message with the given id
    ///
    /// Silently does nothing when the id is unknown or the message is no
    /// longer streaming. This is deliberate: chunk delivery must never fail
    /// a live session, and it is also how late-arriving chunks from a
    /// superseded call are discarded.
    pub fn append_assistant_chunk(&mut self, id: &str, chunk: &str) {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) if message.is_streaming => message.content.push_str(chunk),
            Some(_) => tracing::debug!("Discarding chunk for finalized message {}", id),
            None => tracing::debug!("Discarding chunk for unknown message {}", id),
        }
    }

    /// Marks the message with the given id as no longer streaming
    ///
    /// Idempotent: finalizing an already-final message leaves its content
    /// unchanged. Unknown ids are ignored.
    pub fn finalize_assistant_message(&mut self, id: &str) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            message.is_streaming = false;
        }
    }

    /// Removes the message with the given id, returning true if it existed
    ///
    /// Used by the orchestrator to drop an empty in-progress bubble when the
    /// provider fails before producing any content.
    pub fn remove_message(&mut self, id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        self.messages.len() != before
    }

    /// Returns the id of the currently streaming message, if any
    pub fn streaming_message_id(&self) -> Option<String> {
        self.messages
            .iter()
            .find(|m| m.is_streaming)
            .map(|m| m.id.clone())
    }

    /// Returns the last message, if any
    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Re-derives the title and bumps `updated_at`
    ///
    /// Called by the persistence helper before every write so the stored
    /// snapshot always carries a fresh title and timestamp.
    pub fn touch(&mut self) {
        self.title = derive_title(&self.messages);
        self.updated_at = Utc::now();
    }
}

/// Derives a short title from the earliest non-empty user message
///
/// Pure and deterministic: the same message list always yields the same
/// title. Mode markers are stripped so the title reads as plain text, and
/// long inputs are truncated with an ellipsis. Returns [`DEFAULT_TITLE`]
/// when there is no usable user message.
///
/// # Examples
///
/// ```
/// use parlance::conversation::{derive_title, ChatMessage};
///
/// let messages = vec![ChatMessage::user("Plan my trip to Japan", Vec::new())];
/// assert_eq!(derive_title(&messages), "Plan my trip to Japan");
/// assert_eq!(derive_title(&[]), "New Chat");
/// ```
pub fn derive_title(messages: &[ChatMessage]) -> String {
    let source = messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| strip_mode_marker(&m.content).trim())
        .find(|text| !text.is_empty());

    match source {
        Some(text) => truncate_chars(text, TITLE_MAX_CHARS),
        None => DEFAULT_TITLE.to_string(),
    }
}

/// Strips a known mode marker prefix from a display string
///
/// Exact prefix matching only: text that merely contains a marker somewhere
/// else is untouched.
pub fn strip_mode_marker(content: &str) -> &str {
    content
        .strip_prefix(WEB_SEARCH_MARKER)
        .or_else(|| content.strip_prefix(DEEP_RESEARCH_MARKER))
        .unwrap_or(content)
}

/// Truncates a string to a maximum number of characters, adding an ellipsis
fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        truncated.push_str("...");
        truncated
    }
}
