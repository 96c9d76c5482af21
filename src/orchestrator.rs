//! Streaming chat orchestration
//!
//! Drives one assistant turn from creation to finalization: compose the
//! outbound payload, append the user message, stream chunks into a single
//! in-progress assistant message, and finalize it — or, on failure, leave
//! the conversation in a consistent renderable state with exactly one
//! synthetic error bubble.
//!
//! All adapter-level errors are absorbed here; `run_turn` never returns an
//! error to the caller. Persistence is the caller's concern (see
//! [`storage::persist_best_effort`](crate::storage::persist_best_effort)).

use crate::chat_mode::ChatMode;
use crate::composer::compose;
use crate::conversation::Conversation;
use crate::providers::Provider;
use std::time::Duration;

/// Default delay before the canned fallback message appears
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(600);

/// Outcome of one assistant turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The provider reply streamed to completion
    Completed {
        /// Id of the finalized assistant message
        message_id: String,
    },
    /// No provider is configured; a canned guidance message was appended
    Fallback {
        /// Id of the canned assistant message
        message_id: String,
    },
    /// The provider call failed; a synthetic error message was appended
    Failed {
        /// Id of the synthetic error message
        error_message_id: String,
        /// Id of the partial assistant message, when non-empty content was
        /// kept; `None` when the empty bubble was removed
        partial_message_id: Option<String>,
    },
}

/// Per-turn driver for the streaming chat state machine
///
/// Holds the selected provider adapter (or none, for the fallback path) and
/// the fallback delay. The conversation itself is owned by the caller and
/// mutated in place; only one turn runs at a time per conversation, matching
/// the single-UI-task concurrency model.
pub struct Orchestrator {
    provider: Option<Box<dyn Provider>>,
    fallback_delay: Duration,
}

impl Orchestrator {
    /// Creates an orchestrator over the given provider adapter
    ///
    /// Pass `None` to run in unconfigured mode, where every turn gets a
    /// canned guidance reply and no network call is made.
    pub fn new(provider: Option<Box<dyn Provider>>) -> Self {
        Self {
            provider,
            fallback_delay: DEFAULT_FALLBACK_DELAY,
        }
    }

    /// Set the delay before the canned fallback message appears
    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    /// Returns true when a provider adapter is configured
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Runs one full assistant turn
    ///
    /// Appends the user message (marker-prefixed display text), then either
    /// streams a provider reply into a single assistant message or appends
    /// the mode's canned guidance. Chunks are forwarded to `on_chunk` in
    /// arrival order for live rendering.
    ///
    /// On provider failure the in-progress message is removed if still
    /// empty (otherwise finalized with its partial content) and exactly one
    /// assistant message of the form `Error: ...` is appended. No error is
    /// ever returned to the caller.
    ///
    /// # Arguments
    ///
    /// * `conversation` - The session to mutate
    /// * `input` - Raw user input text
    /// * `mode` - Request classification for this turn
    /// * `attachments` - Opaque attachment references for the user message
    /// * `on_chunk` - Observer invoked once per delivered chunk
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        input: &str,
        mode: ChatMode,
        attachments: Vec<String>,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> TurnOutcome {
        // Compose from history before the new user message lands, so the
        // final outbound entry is the instruction-augmented input rather
        // than a duplicated stored turn.
        let composed = compose(conversation.messages(), input, mode);

        conversation.append_user_message(composed.display_text, attachments);

        let provider = match &self.provider {
            Some(provider) => provider,
            None => {
                tracing::debug!("No provider configured; answering with canned {} guidance", mode);
                if !self.fallback_delay.is_zero() {
                    tokio::time::sleep(self.fallback_delay).await;
                }
                let message_id =
                    conversation.append_completed_assistant_message(mode.fallback_text());
                return TurnOutcome::Fallback { message_id };
            }
        };

        let assistant_id = conversation.begin_assistant_message();

        let result = provider
            .stream_message(&composed.outbound, &mut |chunk| {
                conversation.append_assistant_chunk(&assistant_id, chunk);
                on_chunk(chunk);
            })
            .await;

        match result {
            Ok(full) => {
                conversation.finalize_assistant_message(&assistant_id);
                let delivered = conversation
                    .messages()
                    .iter()
                    .find(|m| m.id == assistant_id)
                    .map(|m| m.content.len())
                    .unwrap_or(0);
                tracing::debug!(
                    "Turn completed: {} bytes streamed, {} bytes returned",
                    delivered,
                    full.len()
                );
                TurnOutcome::Completed {
                    message_id: assistant_id,
                }
            }
            Err(error) => {
                tracing::warn!("Provider {} failed mid-turn: {}", provider.name(), error);

                let partial_is_empty = conversation
                    .messages()
                    .iter()
                    .find(|m| m.id == assistant_id)
                    .map(|m| m.content.is_empty())
                    .unwrap_or(true);

                let partial_message_id = if partial_is_empty {
                    conversation.remove_message(&assistant_id);
                    None
                } else {
                    conversation.finalize_assistant_message(&assistant_id);
                    Some(assistant_id)
                };

                let error_message_id = conversation
                    .append_completed_assistant_message(format!("Error: {}", error));

                TurnOutcome::Failed {
                    error_message_id,
                    partial_message_id,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::error::{ParlanceError, Result};
    use crate::providers::ChatTurn;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted provider: emits fixed chunks, then succeeds or fails
    struct ScriptedProvider {
        chunks: Vec<&'static str>,
        fail_after_chunks: bool,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn succeeding(chunks: Vec<&'static str>) -> Self {
            Self {
                chunks,
                fail_after_chunks: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing_after(chunks: Vec<&'static str>) -> Self {
            Self {
                chunks,
                fail_after_chunks: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn send_message(&self, _turns: &[ChatTurn]) -> Result<String> {
            Ok(self.chunks.concat())
        }

        async fn stream_message(
            &self,
            _turns: &[ChatTurn],
            on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for chunk in &self.chunks {
                on_chunk(chunk);
            }
            if self.fail_after_chunks {
                Err(ParlanceError::Transport("connection reset".to_string()).into())
            } else {
                Ok(self.chunks.concat())
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn fast_orchestrator(provider: Option<Box<dyn Provider>>) -> Orchestrator {
        Orchestrator::new(provider).with_fallback_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_successful_turn_appends_user_then_assistant() {
        let provider = ScriptedProvider::succeeding(vec!["Hello", " world"]);
        let orchestrator = fast_orchestrator(Some(Box::new(provider)));
        let mut conversation = Conversation::new("conv-1");

        let mut seen = String::new();
        let outcome = orchestrator
            .run_turn(&mut conversation, "hi", ChatMode::Chat, Vec::new(), &mut |c| {
                seen.push_str(c)
            })
            .await;

        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.messages()[0].role, Role::User);
        assert_eq!(conversation.messages()[0].content, "hi");
        let assistant = &conversation.messages()[1];
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.content, "Hello world");
        assert!(!assistant.is_streaming);
        assert_eq!(seen, "Hello world");
        assert_eq!(
            outcome,
            TurnOutcome::Completed {
                message_id: assistant.id.clone()
            }
        );
    }

    #[tokio::test]
    async fn test_no_streaming_message_remains_after_turn() {
        let provider = ScriptedProvider::succeeding(vec!["ok"]);
        let orchestrator = fast_orchestrator(Some(Box::new(provider)));
        let mut conversation = Conversation::new("conv-1");

        orchestrator
            .run_turn(&mut conversation, "hi", ChatMode::Chat, Vec::new(), &mut |_| {})
            .await;

        assert_eq!(conversation.streaming_message_id(), None);
    }

    #[tokio::test]
    async fn test_failure_mid_stream_keeps_partial_and_appends_one_error() {
        let provider = ScriptedProvider::failing_after(vec!["Hel", "lo"]);
        let orchestrator = fast_orchestrator(Some(Box::new(provider)));
        let mut conversation = Conversation::new("conv-1");

        let outcome = orchestrator
            .run_turn(&mut conversation, "hi", ChatMode::Chat, Vec::new(), &mut |_| {})
            .await;

        // user + partial assistant + error message
        assert_eq!(conversation.len(), 3);
        let partial = &conversation.messages()[1];
        assert_eq!(partial.content, "Hello");
        assert!(!partial.is_streaming);

        let error_message = &conversation.messages()[2];
        assert!(error_message.content.starts_with("Error: "));
        assert!(error_message.content.contains("connection reset"));
        assert!(!error_message.is_streaming);

        assert_eq!(conversation.streaming_message_id(), None);
        match outcome {
            TurnOutcome::Failed {
                partial_message_id, ..
            } => assert_eq!(partial_message_id, Some(partial.id.clone())),
            other => panic!("Expected Failed outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_before_any_chunk_removes_empty_bubble() {
        let provider = ScriptedProvider::failing_after(vec![]);
        let orchestrator = fast_orchestrator(Some(Box::new(provider)));
        let mut conversation = Conversation::new("conv-1");

        let outcome = orchestrator
            .run_turn(&mut conversation, "hi", ChatMode::Chat, Vec::new(), &mut |_| {})
            .await;

        // user + error message only; no dangling empty bubble
        assert_eq!(conversation.len(), 2);
        assert!(conversation.messages()[1].content.starts_with("Error: "));
        match outcome {
            TurnOutcome::Failed {
                partial_message_id, ..
            } => assert_eq!(partial_message_id, None),
            other => panic!("Expected Failed outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_fallback_appends_guidance_without_network() {
        let orchestrator = fast_orchestrator(None);
        let mut conversation = Conversation::new("conv-1");

        let mut chunk_calls = 0;
        let outcome = orchestrator
            .run_turn(&mut conversation, "hello", ChatMode::Chat, Vec::new(), &mut |_| {
                chunk_calls += 1
            })
            .await;

        assert_eq!(conversation.len(), 2);
        let guidance = &conversation.messages()[1];
        assert_eq!(guidance.role, Role::Assistant);
        assert!(guidance.content.contains("API key"));
        assert!(!guidance.is_streaming);
        assert_eq!(chunk_calls, 0);
        assert!(matches!(outcome, TurnOutcome::Fallback { .. }));
    }

    #[tokio::test]
    async fn test_fallback_text_varies_by_mode() {
        let orchestrator = fast_orchestrator(None);

        let mut texts = Vec::new();
        for mode in [ChatMode::Chat, ChatMode::WebSearch, ChatMode::DeepResearch] {
            let mut conversation = Conversation::new("conv-1");
            orchestrator
                .run_turn(&mut conversation, "hello", mode, Vec::new(), &mut |_| {})
                .await;
            texts.push(conversation.messages()[1].content.clone());
        }

        assert_ne!(texts[0], texts[1]);
        assert_ne!(texts[1], texts[2]);
    }

    /// Records the outbound turn list for later inspection
    struct CapturingProvider {
        captured: std::sync::Arc<std::sync::Mutex<Vec<ChatTurn>>>,
        reply: &'static str,
    }

    #[async_trait]
    impl Provider for CapturingProvider {
        async fn send_message(&self, turns: &[ChatTurn]) -> Result<String> {
            *self.captured.lock().unwrap() = turns.to_vec();
            Ok(self.reply.to_string())
        }

        fn chunk_delay(&self) -> Duration {
            Duration::ZERO
        }

        fn name(&self) -> &'static str {
            "capturing"
        }
    }

    #[tokio::test]
    async fn test_mode_marker_stored_but_not_sent() {
        let captured = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let provider = Box::new(CapturingProvider {
            captured: captured.clone(),
            reply: "done",
        });
        let orchestrator = fast_orchestrator(Some(provider));
        let mut conversation = Conversation::new("conv-1");

        orchestrator
            .run_turn(
                &mut conversation,
                "capital of France",
                ChatMode::WebSearch,
                Vec::new(),
                &mut |_| {},
            )
            .await;

        // Stored display text carries the marker
        let stored = &conversation.messages()[0];
        assert!(stored.content.starts_with(ChatMode::WebSearch.marker()));
        assert!(stored.content.contains("capital of France"));

        // Outbound payload carries the unprefixed instruction
        let captured = captured.lock().unwrap();
        let last = captured.last().unwrap();
        assert!(!last.content.contains(ChatMode::WebSearch.marker()));
        assert!(last.content.contains("capital of France"));
        assert_ne!(last.content, stored.content);
    }

    #[tokio::test]
    async fn test_attachments_recorded_on_user_message() {
        let orchestrator = fast_orchestrator(None);
        let mut conversation = Conversation::new("conv-1");

        orchestrator
            .run_turn(
                &mut conversation,
                "see this",
                ChatMode::Chat,
                vec!["file:///tmp/a.png".to_string()],
                &mut |_| {},
            )
            .await;

        assert_eq!(
            conversation.messages()[0].attachments,
            vec!["file:///tmp/a.png".to_string()]
        );
    }

    #[tokio::test]
    async fn test_second_turn_sends_marker_stripped_history() {
        let captured = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let provider = Box::new(CapturingProvider {
            captured: captured.clone(),
            reply: "answer",
        });
        let orchestrator = fast_orchestrator(Some(provider));
        let mut conversation = Conversation::new("conv-1");

        orchestrator
            .run_turn(
                &mut conversation,
                "weather in Paris",
                ChatMode::WebSearch,
                Vec::new(),
                &mut |_| {},
            )
            .await;
        orchestrator
            .run_turn(&mut conversation, "thanks", ChatMode::Chat, Vec::new(), &mut |_| {})
            .await;

        let captured = captured.lock().unwrap();
        // History turn: the prior user message appears without its marker
        let prior_user = &captured[0];
        assert_eq!(prior_user.role, Role::User);
        assert!(!prior_user.content.contains(ChatMode::WebSearch.marker()));
        assert!(prior_user.content.contains("weather in Paris"));
    }
}
