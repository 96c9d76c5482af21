//! Parlance - Streaming AI chat library
//!
//! This library provides the core functionality for the Parlance chat
//! application: provider adapters with simulated chunked delivery, the
//! per-turn streaming orchestrator, conversation lifecycle management,
//! and persistent history.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `providers`: AI provider abstraction and implementations (OpenAI, Gemini, Claude)
//! - `orchestrator`: Per-turn streaming state machine and fallback handling
//! - `conversation`: Message and conversation types with streaming lifecycle
//! - `composer`: Mode-aware request composition (display text vs outbound payload)
//! - `chat_mode`: Request classification and mode markers
//! - `storage`: Conversation persistence (SQLite and in-memory)
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use parlance::config::Config;
//! use parlance::conversation::Conversation;
//! use parlance::orchestrator::Orchestrator;
//! use parlance::providers::create_provider;
//! use parlance::ChatMode;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     config.validate()?;
//!
//!     let provider = create_provider(&config.provider, &config.chat)?;
//!     let orchestrator = Orchestrator::new(provider);
//!
//!     let mut conversation = Conversation::new("example");
//!     orchestrator
//!         .run_turn(&mut conversation, "Hello!", ChatMode::Chat, Vec::new(), &mut |chunk| {
//!             print!("{}", chunk);
//!         })
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod chat_mode;
pub mod cli;
pub mod commands;
pub mod composer;
pub mod config;
pub mod conversation;
pub mod error;
pub mod orchestrator;
pub mod providers;
pub mod storage;

// Re-export commonly used types
pub use chat_mode::ChatMode;
pub use config::Config;
pub use conversation::{ChatMessage, Conversation, Role};
pub use error::{ParlanceError, Result};
pub use orchestrator::{Orchestrator, TurnOutcome};
pub use storage::{ConversationStore, MemoryStore, SqliteStore};
