//! Stored conversation management.

use crate::cli::HistoryCommand;
use crate::conversation::Role;
use crate::error::Result;
use crate::storage::{ConversationStore, SqliteStore};
use colored::Colorize;

/// Handle history commands
pub fn handle_history(command: HistoryCommand) -> Result<()> {
    let store = SqliteStore::new()?;

    match command {
        HistoryCommand::List => {
            let sessions = store.list_sessions()?;

            if sessions.is_empty() {
                println!("{}", "No conversation history found.".yellow());
                return Ok(());
            }

            println!("\nConversation History:");
            for session in sessions {
                let updated = session.updated_at.format("%Y-%m-%d %H:%M").to_string();
                println!(
                    "  {}  {:<48}  {:>3} messages  {}",
                    session.short_id().cyan(),
                    session.title,
                    session.message_count,
                    updated.dimmed()
                );
            }
            println!();
            println!(
                "Use {} to remove a session.",
                "parlance history delete <ID>".cyan()
            );
            println!();
        }
        HistoryCommand::Show { id } => {
            let conversation = store
                .load()?
                .into_iter()
                .find(|c| c.id == id || c.id.starts_with(&id));

            match conversation {
                Some(conversation) => {
                    println!("\n{} ({})\n", conversation.title.bold(), conversation.id);
                    for message in conversation.messages() {
                        let tag = match message.role {
                            Role::User => "user:".bold().cyan(),
                            Role::Assistant => "assistant:".bold().green(),
                        };
                        println!("{} {}", tag, message.content);
                        for attachment in &message.attachments {
                            println!("  {} {}", "attachment:".dimmed(), attachment);
                        }
                        println!();
                    }
                }
                None => {
                    println!("{}", format!("No conversation matching {}", id).yellow());
                }
            }
        }
        HistoryCommand::Delete { id } => {
            if store.delete(&id)? {
                println!("{}", format!("Deleted conversation {}", id).green());
            } else {
                println!("{}", format!("No conversation matching {}", id).yellow());
            }
        }
    }

    Ok(())
}
