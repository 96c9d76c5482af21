//! Interactive chat mode handler.
//!
//! Instantiates the configured provider, creates an orchestrator, and runs a
//! readline-based loop that submits user input and renders the streamed
//! reply chunk by chunk. The conversation is persisted after every turn.

use crate::chat_mode::ChatMode;
use crate::config::Config;
use crate::conversation::Conversation;
use crate::error::Result;
use crate::orchestrator::{Orchestrator, TurnOutcome};
use crate::providers::create_provider;
use crate::storage::{persist_best_effort, resume_most_recent, ConversationStore, SqliteStore};

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use std::time::Duration;

/// Result of parsing one line of user input
enum ChatInput<'a> {
    /// A regular message for the assistant
    Message(&'a str),
    /// Start a fresh conversation
    New,
    /// Switch the chat mode
    SwitchMode(ChatMode),
    /// Queue an attachment reference for the next message
    Attach(&'a str),
    /// Print the command summary
    Help,
    /// Leave the session
    Exit,
    /// Unrecognized slash command
    Unknown(&'a str),
}

/// Start an interactive chat session
///
/// # Arguments
///
/// * `config` - Global configuration (consumed)
/// * `mode` - Optional initial chat mode override
/// * `start_new` - Start a fresh conversation instead of resuming the latest
pub async fn run_chat(config: Config, mode: Option<String>, start_new: bool) -> Result<()> {
    let provider = create_provider(&config.provider, &config.chat)?;
    let orchestrator = Orchestrator::new(provider)
        .with_fallback_delay(Duration::from_millis(config.chat.fallback_delay_ms));

    let store = SqliteStore::new()?;

    let mut conversation = if start_new {
        Conversation::new(store.create_id())
    } else {
        match resume_most_recent(&store)? {
            Some(resumed) => {
                tracing::info!("Resuming conversation {}", resumed.id);
                resumed
            }
            None => Conversation::new(store.create_id()),
        }
    };

    // A crash mid-stream can leave a message flagged as streaming on disk;
    // settle it before the session starts.
    if let Some(id) = conversation.streaming_message_id() {
        tracing::warn!("Found interrupted streaming message; finalizing");
        conversation.finalize_assistant_message(&id);
    }

    let mut current_mode = mode
        .as_deref()
        .and_then(|m| ChatMode::parse_str(m).ok())
        .unwrap_or_default();

    let mut pending_attachments: Vec<String> = Vec::new();
    let mut rl = DefaultEditor::new()?;

    print_welcome(&conversation, current_mode, orchestrator.is_configured());

    loop {
        let prompt = format!("{} > ", current_mode.colored_tag());
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match parse_input(trimmed) {
                    ChatInput::Exit => break,
                    ChatInput::Help => {
                        print_help();
                    }
                    ChatInput::New => {
                        conversation = Conversation::new(store.create_id());
                        pending_attachments.clear();
                        println!("{}\n", "Started a new conversation.".green());
                    }
                    ChatInput::SwitchMode(new_mode) => {
                        current_mode = new_mode;
                        println!("Switched to {} mode\n", current_mode.colored_tag());
                    }
                    ChatInput::Attach(reference) => {
                        pending_attachments.push(reference.to_string());
                        println!("{}\n", format!("Attached {}", reference).cyan());
                    }
                    ChatInput::Unknown(command) => {
                        println!(
                            "{}\n",
                            format!("Unknown command {} (try /help)", command).yellow()
                        );
                    }
                    ChatInput::Message(text) => {
                        let attachments = std::mem::take(&mut pending_attachments);

                        print!("{} ", "assistant:".bold().green());
                        let _ = std::io::stdout().flush();

                        let outcome = orchestrator
                            .run_turn(&mut conversation, text, current_mode, attachments, &mut |chunk| {
                                print!("{}", chunk);
                                let _ = std::io::stdout().flush();
                            })
                            .await;

                        // Fallback and error replies arrive whole rather than
                        // through the chunk callback; print them here.
                        match &outcome {
                            TurnOutcome::Completed { .. } => {}
                            TurnOutcome::Fallback { message_id } => {
                                print_message_by_id(&conversation, message_id);
                            }
                            TurnOutcome::Failed {
                                error_message_id, ..
                            } => {
                                print_message_by_id(&conversation, error_message_id);
                            }
                        }
                        println!("\n");

                        persist_best_effort(&store, &mut conversation);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "Interrupted. Use /quit to leave.".yellow());
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                tracing::error!("Readline error: {}", e);
                break;
            }
        }
    }

    persist_best_effort(&store, &mut conversation);
    println!("{}", "Goodbye!".green());
    Ok(())
}

fn print_message_by_id(conversation: &Conversation, id: &str) {
    if let Some(message) = conversation.messages().iter().find(|m| m.id == id) {
        print!("{}", message.content);
    }
}

fn parse_input(line: &str) -> ChatInput<'_> {
    if !line.starts_with('/') {
        return ChatInput::Message(line);
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };

    match command {
        "/quit" | "/exit" => ChatInput::Exit,
        "/help" => ChatInput::Help,
        "/new" => ChatInput::New,
        "/mode" => match ChatMode::parse_str(rest) {
            Ok(mode) => ChatInput::SwitchMode(mode),
            Err(_) => ChatInput::Unknown(line),
        },
        "/attach" if !rest.is_empty() => ChatInput::Attach(rest),
        _ => ChatInput::Unknown(command),
    }
}

fn print_welcome(conversation: &Conversation, mode: ChatMode, configured: bool) {
    println!();
    println!("{}", "Parlance".bold());
    println!("Conversation: {} ({})", conversation.title.cyan(), &conversation.id[..8.min(conversation.id.len())]);
    println!("Mode: {}", mode.colored_tag());
    if !configured {
        println!(
            "{}",
            "No provider credential configured; replies will be setup guidance.".yellow()
        );
    }
    println!("Type {} for commands.\n", "/help".cyan());
}

fn print_help() {
    println!("Commands:");
    println!("  {}            Start a fresh conversation", "/new".cyan());
    println!(
        "  {}   Switch mode (chat, web-search, deep-research)",
        "/mode <name>".cyan()
    );
    println!("  {}  Queue an attachment for the next message", "/attach <ref>".cyan());
    println!("  {}           Show this help", "/help".cyan());
    println!("  {}           Leave the session", "/quit".cyan());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_plain_message() {
        assert!(matches!(parse_input("hello there"), ChatInput::Message("hello there")));
    }

    #[test]
    fn test_parse_input_quit_variants() {
        assert!(matches!(parse_input("/quit"), ChatInput::Exit));
        assert!(matches!(parse_input("/exit"), ChatInput::Exit));
    }

    #[test]
    fn test_parse_input_mode_switch() {
        match parse_input("/mode web-search") {
            ChatInput::SwitchMode(mode) => assert_eq!(mode, ChatMode::WebSearch),
            _ => panic!("Expected SwitchMode"),
        }
    }

    #[test]
    fn test_parse_input_bad_mode_is_unknown() {
        assert!(matches!(parse_input("/mode bogus"), ChatInput::Unknown(_)));
    }

    #[test]
    fn test_parse_input_attach() {
        match parse_input("/attach file:///tmp/a.png") {
            ChatInput::Attach(reference) => assert_eq!(reference, "file:///tmp/a.png"),
            _ => panic!("Expected Attach"),
        }
    }

    #[test]
    fn test_parse_input_attach_without_argument_is_unknown() {
        assert!(matches!(parse_input("/attach"), ChatInput::Unknown(_)));
    }

    #[test]
    fn test_parse_input_unknown_command() {
        assert!(matches!(parse_input("/frobnicate"), ChatInput::Unknown("/frobnicate")));
    }
}
