/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes two top-level command modules:

- `chat`    — Interactive chat session
- `history` — Stored conversation management

These handlers are intentionally small and use the library components:
providers, the orchestrator, and the conversation store.
*/

pub mod chat;
pub mod history;
