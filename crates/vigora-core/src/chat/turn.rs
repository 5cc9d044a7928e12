//! Chat turn coordinator.
//!
//! A turn is one user message in, one assistant message out. The coordinator
//! resolves (or creates) the chat, serializes turns per chat, rebuilds the
//! model context from persisted history, calls the language-model
//! collaborator in buffered or streamed mode, and persists the exchange.
//!
//! Ordering of a turn is fixed:
//! 1. validate input, resolve chat (no writes on NotFound/Forbidden)
//! 2. take the per-chat lock
//! 3. read the last [`HISTORY_WINDOW`] persisted messages
//! 4. persist the user message -- it is durable even if the model call fails
//! 5. call the model; persist the assistant message exactly once on completion
//!
//! In streamed mode the provider stream is driven by a spawned task holding
//! the lock, so step 5 runs to completion even when the client disconnects
//! mid-stream.

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, warn};
use uuid::Uuid;

use vigora_types::chat::{Chat, ChatMessage, MAX_MESSAGE_LEN};
use vigora_types::error::TurnError;
use vigora_types::llm::{
    ChatRole, CompletionRequest, LlmMessage, StopReason, StreamEvent,
};

use crate::chat::service::ChatService;
use crate::llm::provider::LlmProvider;
use crate::repository::chat::ChatRepository;

/// How many persisted messages are replayed to the model per turn.
pub const HISTORY_WINDOW: i64 = 10;

/// Fixed assistant persona prepended to every model request.
pub const SYSTEM_INSTRUCTION: &str = "You are a fitness and health coach. \
Always reply in the same language the user writes in. Be helpful, motivating \
and personalized. Keep answers concise but informative.";

/// Result of a buffered turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub chat: Chat,
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
    pub stop_reason: StopReason,
}

/// Events delivered to the client during a streamed turn.
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// Incremental assistant text.
    Delta { text: String },
    /// The turn completed; the assistant message is persisted.
    Completed {
        message: ChatMessage,
        stop_reason: StopReason,
    },
    /// The turn failed after streaming began. No assistant row was written;
    /// the user message stays durable.
    Failed { message: String },
}

/// A streamed turn: the resolved chat plus the event channel.
///
/// Dropping the receiver does not abort the turn -- persistence still runs
/// when the model signals completion.
pub struct StreamedTurn {
    pub chat: Chat,
    pub events: mpsc::Receiver<TurnEvent>,
}

/// Coordinates chat turns against the storage layer and the LLM collaborator.
pub struct TurnCoordinator<C: ChatRepository, P: LlmProvider> {
    chats: Arc<ChatService<C>>,
    provider: Arc<P>,
    /// Per-chat locks serializing turns so at most one model-call +
    /// persistence sequence runs per chat at a time.
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl<C, P> TurnCoordinator<C, P>
where
    C: ChatRepository + 'static,
    P: LlmProvider,
{
    pub fn new(chats: Arc<ChatService<C>>, provider: Arc<P>) -> Self {
        Self {
            chats,
            provider,
            locks: DashMap::new(),
        }
    }

    /// Run a turn in buffered mode: block until the full completion is
    /// available, persist it, and return the assistant message.
    pub async fn buffered_turn(
        &self,
        user_id: Uuid,
        chat_id: Option<Uuid>,
        message: &str,
    ) -> Result<TurnOutcome, TurnError> {
        let content = validate_message(message)?;
        let (chat, _guard) = self.resolve_and_lock(user_id, chat_id).await?;
        let (request, user_message) = self.stage(&chat, &content).await?;

        // Upstream failure leaves the user message durable and writes
        // nothing else; it is surfaced to the caller without retry.
        let response = self.provider.complete(&request).await?;

        let assistant_message = self
            .chats
            .append_message(chat.id, response.content, false)
            .await?;

        Ok(TurnOutcome {
            chat,
            user_message,
            assistant_message,
            stop_reason: response.stop_reason,
        })
    }

    /// Run a turn in streamed mode: deltas are delivered over the returned
    /// channel as they arrive; the exchange is persisted once the model
    /// signals completion, whether or not the receiver is still attached.
    pub async fn streamed_turn(
        &self,
        user_id: Uuid,
        chat_id: Option<Uuid>,
        message: &str,
    ) -> Result<StreamedTurn, TurnError> {
        let content = validate_message(message)?;
        let (chat, guard) = self.resolve_and_lock(user_id, chat_id).await?;
        let (request, _user_message) = self.stage(&chat, &content).await?;

        let llm_stream = self.provider.stream(request);
        let (tx, rx) = mpsc::channel(32);
        let chats = Arc::clone(&self.chats);
        let chat_id = chat.id;

        tokio::spawn(async move {
            // Holds the per-chat lock until persistence is done.
            let _guard = guard;
            let mut llm_stream = llm_stream;

            let mut full_response = String::new();
            let mut stop_reason = StopReason::Stop;
            let mut finished = false;

            while let Some(event) = llm_stream.next().await {
                match event {
                    Ok(StreamEvent::TextDelta { text }) => {
                        full_response.push_str(&text);
                        // Send failures mean the client went away; keep
                        // draining the model stream so persistence runs.
                        let _ = tx.send(TurnEvent::Delta { text }).await;
                    }
                    Ok(StreamEvent::MessageDelta { stop_reason: reason }) => {
                        stop_reason = reason;
                    }
                    Ok(StreamEvent::Usage(_)) => {}
                    Ok(StreamEvent::Done) => {
                        finished = true;
                        break;
                    }
                    Err(e) => {
                        warn!(chat_id = %chat_id, error = %e, "model stream failed");
                        let _ = tx
                            .send(TurnEvent::Failed {
                                message: e.to_string(),
                            })
                            .await;
                        return;
                    }
                }
            }

            if !finished {
                warn!(chat_id = %chat_id, "model stream ended without finish event");
                let _ = tx
                    .send(TurnEvent::Failed {
                        message: "model stream ended without finish event".to_string(),
                    })
                    .await;
                return;
            }

            match chats.append_message(chat_id, full_response, false).await {
                Ok(message) => {
                    let _ = tx
                        .send(TurnEvent::Completed {
                            message,
                            stop_reason,
                        })
                        .await;
                }
                Err(e) => {
                    error!(chat_id = %chat_id, error = %e, "failed to persist assistant message");
                    let _ = tx
                        .send(TurnEvent::Failed {
                            message: "failed to persist assistant message".to_string(),
                        })
                        .await;
                }
            }
        });

        Ok(StreamedTurn { chat, events: rx })
    }

    /// Resolve (or create) the chat, then take its turn lock.
    ///
    /// NotFound/Forbidden short-circuit here, before any write or model call.
    async fn resolve_and_lock(
        &self,
        user_id: Uuid,
        chat_id: Option<Uuid>,
    ) -> Result<(Chat, OwnedMutexGuard<()>), TurnError> {
        let chat = match chat_id {
            Some(id) => self.chats.get_chat(&id, &user_id).await?,
            None => self.chats.create_chat(user_id, None).await?,
        };

        let lock = self
            .locks
            .entry(chat.id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        Ok((chat, guard))
    }

    /// Build the model request from persisted history and durably record the
    /// new user message. Must run under the chat's turn lock.
    async fn stage(
        &self,
        chat: &Chat,
        content: &str,
    ) -> Result<(CompletionRequest, ChatMessage), TurnError> {
        let history = self.chats.recent_messages(&chat.id, HISTORY_WINDOW).await?;

        let user_message = self
            .chats
            .append_message(chat.id, content.to_string(), true)
            .await?;

        let mut messages: Vec<LlmMessage> = history
            .iter()
            .map(|m| LlmMessage {
                role: if m.is_user {
                    ChatRole::User
                } else {
                    ChatRole::Assistant
                },
                content: m.content.clone(),
            })
            .collect();
        messages.push(LlmMessage {
            role: ChatRole::User,
            content: content.to_string(),
        });

        let request = CompletionRequest {
            model: self.provider.model().to_string(),
            messages,
            system: Some(SYSTEM_INSTRUCTION.to_string()),
            max_output_tokens: None,
            temperature: None,
        };

        Ok((request, user_message))
    }
}

fn validate_message(message: &str) -> Result<String, TurnError> {
    let content = message.trim();
    if content.is_empty() {
        return Err(TurnError::Validation("message cannot be empty".to_string()));
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(TurnError::Validation(format!(
            "message cannot exceed {MAX_MESSAGE_LEN} characters"
        )));
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{InMemoryChatRepository, ScriptedProvider, ScriptedReply};
    use std::time::Duration;
    use vigora_types::error::ChatError;
    use vigora_types::llm::LlmError;

    fn coordinator(
        script: Vec<ScriptedReply>,
    ) -> (
        Arc<ChatService<InMemoryChatRepository>>,
        Arc<ScriptedProvider>,
        TurnCoordinator<InMemoryChatRepository, ScriptedProvider>,
    ) {
        let chats = Arc::new(ChatService::new(InMemoryChatRepository::default()));
        let provider = Arc::new(ScriptedProvider::new(script));
        let coordinator = TurnCoordinator::new(Arc::clone(&chats), Arc::clone(&provider));
        (chats, provider, coordinator)
    }

    #[tokio::test]
    async fn test_buffered_turn_creates_chat_and_persists_pair() {
        let (chats, _provider, turns) = coordinator(vec![ScriptedReply::Text(
            "Bora treinar!".to_string(),
        )]);
        let user = Uuid::now_v7();

        let outcome = turns.buffered_turn(user, None, "Oi, coach").await.unwrap();
        assert_eq!(outcome.chat.name, "Novo Chat");
        assert!(outcome.user_message.is_user);
        assert!(!outcome.assistant_message.is_user);
        assert_eq!(outcome.assistant_message.content, "Bora treinar!");
        assert_eq!(outcome.stop_reason, StopReason::Stop);

        // Exactly one chat, exactly the two rows
        let list = chats.list_chats(&user).await.unwrap();
        assert_eq!(list.len(), 1);
        let history = chats.messages(&outcome.chat.id, &user).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].is_user);
        assert!(!history[1].is_user);
    }

    #[tokio::test]
    async fn test_turn_on_unknown_chat_persists_nothing() {
        let (chats, provider, turns) =
            coordinator(vec![ScriptedReply::Text("unused".to_string())]);
        let user = Uuid::now_v7();

        let err = turns
            .buffered_turn(user, Some(Uuid::now_v7()), "Oi")
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::Chat(ChatError::NotFound)));

        assert!(chats.list_chats(&user).await.unwrap().is_empty());
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cross_user_turn_is_forbidden_before_any_write() {
        let (chats, provider, turns) =
            coordinator(vec![ScriptedReply::Text("unused".to_string())]);
        let owner = Uuid::now_v7();
        let stranger = Uuid::now_v7();
        let chat = chats.create_chat(owner, None).await.unwrap();

        let err = turns
            .buffered_turn(stranger, Some(chat.id), "Oi")
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::Chat(ChatError::Forbidden)));
        assert!(chats.messages(&chat.id, &owner).await.unwrap().is_empty());
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_context_window_replays_history_plus_new_message() {
        let (chats, provider, turns) =
            coordinator(vec![ScriptedReply::Text("São 3 atividades".to_string())]);
        let user = Uuid::now_v7();
        let chat = chats.create_chat(user, None).await.unwrap();

        // 3 prior turns = 6 persisted messages
        for i in 0..3 {
            chats
                .append_message(chat.id, format!("pergunta {i}"), true)
                .await
                .unwrap();
            chats
                .append_message(chat.id, format!("resposta {i}"), false)
                .await
                .unwrap();
        }

        turns
            .buffered_turn(user, Some(chat.id), "Quantas atividades eu fiz essa semana?")
            .await
            .unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        // 6 history + 1 new user message; system instruction rides separately
        assert_eq!(request.messages.len(), 7);
        assert_eq!(request.system.as_deref(), Some(SYSTEM_INSTRUCTION));
        assert_eq!(request.messages[0].content, "pergunta 0");
        assert_eq!(request.messages[0].role, ChatRole::User);
        assert_eq!(request.messages[1].role, ChatRole::Assistant);
        assert_eq!(
            request.messages[6].content,
            "Quantas atividades eu fiz essa semana?"
        );

        // Exactly 2 new rows persisted
        let history = chats.messages(&chat.id, &user).await.unwrap();
        assert_eq!(history.len(), 8);
    }

    #[tokio::test]
    async fn test_context_window_is_capped_at_ten() {
        let (chats, provider, turns) =
            coordinator(vec![ScriptedReply::Text("ok".to_string())]);
        let user = Uuid::now_v7();
        let chat = chats.create_chat(user, None).await.unwrap();

        for i in 0..12 {
            chats
                .append_message(chat.id, format!("m{i}"), i % 2 == 0)
                .await
                .unwrap();
        }

        turns.buffered_turn(user, Some(chat.id), "nova").await.unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.messages.len(), 11);
        // Oldest two fell out of the window
        assert_eq!(request.messages[0].content, "m2");
        assert_eq!(request.messages[9].content, "m11");
        assert_eq!(request.messages[10].content, "nova");
    }

    #[tokio::test]
    async fn test_upstream_failure_keeps_user_message_only() {
        let (chats, _provider, turns) = coordinator(vec![ScriptedReply::Failure(
            LlmError::Provider {
                message: "HTTP 500".to_string(),
            },
        )]);
        let user = Uuid::now_v7();
        let chat = chats.create_chat(user, None).await.unwrap();

        let err = turns
            .buffered_turn(user, Some(chat.id), "Oi")
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::Upstream(_)));

        // Persist-before: the accepted user message survived the failure
        let history = chats.messages(&chat.id, &user).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_user);
    }

    #[tokio::test]
    async fn test_empty_message_rejected_before_storage() {
        let (chats, provider, turns) =
            coordinator(vec![ScriptedReply::Text("unused".to_string())]);
        let user = Uuid::now_v7();

        let err = turns.buffered_turn(user, None, "   ").await.unwrap_err();
        assert!(matches!(err, TurnError::Validation(_)));
        assert!(chats.list_chats(&user).await.unwrap().is_empty());
        assert!(provider.requests().is_empty());

        let err = turns
            .buffered_turn(user, None, &"x".repeat(MAX_MESSAGE_LEN + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::Validation(_)));
    }

    #[tokio::test]
    async fn test_streamed_turn_delivers_deltas_then_persists() {
        let (chats, _provider, turns) = coordinator(vec![ScriptedReply::Stream(vec![
            Ok(StreamEvent::TextDelta {
                text: "Bora ".to_string(),
            }),
            Ok(StreamEvent::TextDelta {
                text: "treinar!".to_string(),
            }),
            Ok(StreamEvent::MessageDelta {
                stop_reason: StopReason::Stop,
            }),
            Ok(StreamEvent::Done),
        ])]);
        let user = Uuid::now_v7();

        let mut streamed = turns.streamed_turn(user, None, "Oi").await.unwrap();

        let mut deltas = String::new();
        let mut completed = None;
        while let Some(event) = streamed.events.recv().await {
            match event {
                TurnEvent::Delta { text } => deltas.push_str(&text),
                TurnEvent::Completed {
                    message,
                    stop_reason,
                } => {
                    assert_eq!(stop_reason, StopReason::Stop);
                    completed = Some(message);
                }
                TurnEvent::Failed { message } => panic!("unexpected failure: {message}"),
            }
        }

        assert_eq!(deltas, "Bora treinar!");
        let completed = completed.expect("missing Completed event");
        assert_eq!(completed.content, "Bora treinar!");

        let history = chats.messages(&streamed.chat.id, &user).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "Bora treinar!");
    }

    #[tokio::test]
    async fn test_streamed_failure_writes_no_assistant_row() {
        let (chats, _provider, turns) = coordinator(vec![ScriptedReply::Stream(vec![
            Ok(StreamEvent::TextDelta {
                text: "Bora".to_string(),
            }),
            Err(LlmError::Stream("connection reset".to_string())),
        ])]);
        let user = Uuid::now_v7();

        let mut streamed = turns.streamed_turn(user, None, "Oi").await.unwrap();

        let mut failed = false;
        while let Some(event) = streamed.events.recv().await {
            if let TurnEvent::Failed { .. } = event {
                failed = true;
            }
        }
        assert!(failed);

        let history = chats.messages(&streamed.chat.id, &user).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_user);
    }

    #[tokio::test]
    async fn test_truncated_stream_without_done_fails() {
        let (chats, _provider, turns) = coordinator(vec![ScriptedReply::Stream(vec![
            Ok(StreamEvent::TextDelta {
                text: "Bo".to_string(),
            }),
            // stream ends here with no Done
        ])]);
        let user = Uuid::now_v7();

        let mut streamed = turns.streamed_turn(user, None, "Oi").await.unwrap();
        let mut failed = false;
        while let Some(event) = streamed.events.recv().await {
            if let TurnEvent::Failed { .. } = event {
                failed = true;
            }
        }
        assert!(failed);
        let history = chats.messages(&streamed.chat.id, &user).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_client_disconnect_still_persists_completion() {
        let (chats, _provider, turns) = coordinator(vec![ScriptedReply::Stream(vec![
            Ok(StreamEvent::TextDelta {
                text: "Bora ".to_string(),
            }),
            Ok(StreamEvent::TextDelta {
                text: "treinar!".to_string(),
            }),
            Ok(StreamEvent::Done),
        ])]);
        let user = Uuid::now_v7();

        let streamed = turns.streamed_turn(user, None, "Oi").await.unwrap();
        let chat_id = streamed.chat.id;
        // Client goes away after the first delta would have been delivered.
        drop(streamed.events);

        // Persistence still runs once the model stream finishes.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let history = chats.messages(&chat_id, &user).await.unwrap();
            if history.len() == 2 {
                assert_eq!(history[1].content, "Bora treinar!");
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "assistant message never persisted"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_one_chat_are_serialized() {
        let (chats, _provider, turns) = coordinator(vec![
            ScriptedReply::Text("resposta A".to_string()),
            ScriptedReply::Text("resposta B".to_string()),
        ]);
        let user = Uuid::now_v7();
        let chat = chats.create_chat(user, None).await.unwrap();

        let turns = Arc::new(turns);
        let (a, b) = tokio::join!(
            {
                let turns = Arc::clone(&turns);
                async move { turns.buffered_turn(user, Some(chat.id), "primeira").await }
            },
            {
                let turns = Arc::clone(&turns);
                async move { turns.buffered_turn(user, Some(chat.id), "segunda").await }
            }
        );
        a.unwrap();
        b.unwrap();

        // With the per-chat lock, rows come in strict user/assistant pairs.
        let history = chats.messages(&chat.id, &user).await.unwrap();
        assert_eq!(history.len(), 4);
        assert!(history[0].is_user);
        assert!(!history[1].is_user);
        assert!(history[2].is_user);
        assert!(!history[3].is_user);
    }
}
