//! Command-line interface definition for Parlance
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat and history management.

use clap::{Parser, Subcommand};

/// Parlance - Streaming AI chat CLI
///
/// Chat with OpenAI, Gemini, or Claude through a single interface with
/// chunked reply delivery and persistent conversation history.
#[derive(Parser, Debug, Clone)]
#[command(name = "parlance")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the history database path
    #[arg(long, env = "PARLANCE_HISTORY_DB")]
    pub storage_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Parlance
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Initial chat mode (chat, web-search, deep-research)
        #[arg(short, long, default_value = "chat")]
        mode: Option<String>,

        /// Start a fresh conversation instead of resuming the latest
        #[arg(short, long)]
        new: bool,
    },

    /// Manage conversation history
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// History management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List stored conversations
    List,

    /// Show the messages of a conversation
    Show {
        /// Conversation id (full UUID or short prefix)
        id: String,
    },

    /// Delete a conversation
    Delete {
        /// Conversation id (full UUID or short prefix)
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
