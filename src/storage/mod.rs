//! Conversation persistence
//!
//! Defines the [`ConversationStore`] trait plus two backends: SQLite for the
//! real application and an in-memory store for tests. Writes go through
//! [`persist_best_effort`], which refreshes the conversation's derived title
//! and timestamp, then saves and swallows failures so a broken disk never
//! interrupts an in-flight chat.

use crate::conversation::{ChatMessage, Conversation};
use crate::error::{ParlanceError, Result};
use anyhow::Context;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use uuid::Uuid;

pub mod types;
pub use types::SessionSummary;

/// Persistence backend for conversation history
///
/// Implementations must tolerate an empty message list: a freshly created
/// conversation is saved before its first turn completes.
pub trait ConversationStore: Send + Sync {
    /// Load all stored conversations, most recently updated first
    fn load(&self) -> Result<Vec<Conversation>>;

    /// Save or update a conversation, preserving `created_at` on update
    fn save(&self, conversation: &Conversation) -> Result<()>;

    /// Delete a conversation by id; returns whether a record was removed
    fn delete(&self, id: &str) -> Result<bool>;

    /// Mint a fresh conversation id
    fn create_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Summaries of all stored sessions, most recently updated first
    fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        Ok(self
            .load()?
            .iter()
            .map(|c| SessionSummary {
                id: c.id.clone(),
                title: c.title.clone(),
                created_at: c.created_at,
                updated_at: c.updated_at,
                message_count: c.len(),
            })
            .collect())
    }
}

/// Refresh derived fields and save, logging instead of failing
///
/// Called after every mutation point in the chat loop (user message
/// appended, stream finished or failed, fallback appended). A storage error
/// is reported via tracing and otherwise ignored; the in-memory session
/// stays authoritative.
pub fn persist_best_effort(store: &dyn ConversationStore, conversation: &mut Conversation) {
    conversation.touch();
    if let Err(e) = store.save(conversation) {
        tracing::warn!("Failed to persist conversation {}: {}", conversation.id, e);
    }
}

/// The most recently updated stored conversation, if any
///
/// Used at startup to resume where the user left off.
pub fn resume_most_recent(store: &dyn ConversationStore) -> Result<Option<Conversation>> {
    Ok(store.load()?.into_iter().next())
}

/// SQLite-backed conversation store
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Create a store in the user's data directory
    ///
    /// The database path can be overridden with the `PARLANCE_HISTORY_DB`
    /// environment variable, which keeps tests and alternate profiles away
    /// from the real history file.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("PARLANCE_HISTORY_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("dev", "parlance", "parlance")
            .ok_or_else(|| ParlanceError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        Self::new_with_path(data_dir.join("history.db"))
    }

    /// Create a store backed by the given database path
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::storage::SqliteStore;
    ///
    /// let store = SqliteStore::new_with_path("/tmp/parlance_doc_test.db").unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| ParlanceError::Storage(e.to_string()))?;
        }

        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| ParlanceError::Storage(e.to_string()).into())
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                messages JSON NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        Ok(())
    }
}

impl ConversationStore for SqliteStore {
    fn load(&self) -> Result<Vec<Conversation>> {
        let conn = self.open()?;

        let mut stmt = conn
            .prepare(
                "SELECT id, title, created_at, updated_at, messages
                FROM conversations
                ORDER BY updated_at DESC",
            )
            .context("Failed to prepare statement")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let title: String = row.get(1)?;
                let created_at: String = row.get(2)?;
                let updated_at: String = row.get(3)?;
                let messages_json: String = row.get(4)?;
                Ok((id, title, created_at, updated_at, messages_json))
            })
            .context("Failed to query conversations")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        let mut conversations = Vec::new();
        for row in rows {
            let (id, title, created_at, updated_at, messages_json) = row
                .context("Failed to read conversation row")
                .map_err(|e| ParlanceError::Storage(e.to_string()))?;

            let messages: Vec<ChatMessage> = serde_json::from_str(&messages_json)
                .context("Failed to deserialize messages")
                .map_err(|e| ParlanceError::Storage(e.to_string()))?;

            conversations.push(Conversation::from_parts(
                id,
                title,
                messages,
                parse_timestamp(&created_at),
                parse_timestamp(&updated_at),
            ));
        }

        Ok(conversations)
    }

    fn save(&self, conversation: &Conversation) -> Result<()> {
        let mut conn = self.open()?;

        let messages_json = serde_json::to_string(conversation.messages())
            .context("Failed to serialize messages")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        // Check if exists to preserve created_at
        let exists: bool = tx
            .query_row(
                "SELECT 1 FROM conversations WHERE id = ?",
                params![conversation.id],
                |_| Ok(true),
            )
            .optional()
            .unwrap_or(Some(false))
            .unwrap_or(false);

        if exists {
            tx.execute(
                "UPDATE conversations SET
                    title = ?,
                    updated_at = ?,
                    messages = ?
                WHERE id = ?",
                params![
                    conversation.title,
                    conversation.updated_at.to_rfc3339(),
                    messages_json,
                    conversation.id
                ],
            )
            .context("Failed to update conversation")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;
        } else {
            tx.execute(
                "INSERT INTO conversations (id, title, created_at, updated_at, messages)
                VALUES (?, ?, ?, ?, ?)",
                params![
                    conversation.id,
                    conversation.title,
                    conversation.created_at.to_rfc3339(),
                    conversation.updated_at.to_rfc3339(),
                    messages_json
                ],
            )
            .context("Failed to insert conversation")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;
        }

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.open()?;

        // Support both full UUID and short prefix matching
        let (query, param) = if id.len() == 36 {
            ("DELETE FROM conversations WHERE id = ?", id.to_string())
        } else {
            (
                "DELETE FROM conversations WHERE id LIKE ?",
                format!("{}%", id),
            )
        };

        let removed = conn
            .execute(query, params![param])
            .context("Failed to delete conversation")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        Ok(removed > 0)
    }
}

/// Parse a stored RFC 3339 timestamp, falling back to now on corruption
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// In-memory conversation store for tests
#[derive(Default)]
pub struct MemoryStore {
    conversations: std::sync::Mutex<Vec<Conversation>>,
}

impl MemoryStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for MemoryStore {
    fn load(&self) -> Result<Vec<Conversation>> {
        let mut conversations = self
            .conversations
            .lock()
            .map_err(|_| ParlanceError::Storage("Store lock poisoned".into()))?
            .clone();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    fn save(&self, conversation: &Conversation) -> Result<()> {
        let mut guard = self
            .conversations
            .lock()
            .map_err(|_| ParlanceError::Storage("Store lock poisoned".into()))?;
        match guard.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = conversation.clone();
                existing.created_at = created_at;
            }
            None => guard.push(conversation.clone()),
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut guard = self
            .conversations
            .lock()
            .map_err(|_| ParlanceError::Storage("Store lock poisoned".into()))?;
        let before = guard.len();
        guard.retain(|c| c.id != id && !c.id.starts_with(id));
        Ok(guard.len() < before)
    }
}
