//! The chat turn endpoint: one user message in, one assistant reply out.
//!
//! POST /api/chat runs a turn. Delivery mode is caller-controlled: the
//! `X-No-Stream: true` header selects a buffered JSON response; the default
//! is an SSE stream of events:
//!
//! - `chat`       -- initial event with `{ "chat_id": "..." }`
//! - `text_delta` -- incremental text: `{ "text": "..." }`
//! - `message`    -- the persisted assistant message
//! - `done`       -- stream complete: `{}`
//! - `error`      -- the turn failed; no `done` follows
//!
//! GET /api/chat?chat_id= loads a chat's messages for the conversation view.

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use vigora_core::chat::turn::TurnEvent;
use vigora_types::chat::ChatMessage;
use vigora_types::llm::StopReason;

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::state::AppState;

/// Header selecting buffered delivery.
const NO_STREAM_HEADER: &str = "x-no-stream";

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    /// Chat to continue; absent means "create a new chat first".
    pub chat_id: Option<Uuid>,
    /// The new user message.
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BufferedTurnResponse {
    pub chat_id: Uuid,
    pub message: ChatMessage,
    pub stop_reason: StopReason,
}

#[derive(Debug, Deserialize)]
pub struct LoadChatQuery {
    pub chat_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct LoadChatResponse {
    pub chat_id: Uuid,
    pub chat_name: String,
    pub messages: Vec<ChatMessage>,
}

/// POST /api/chat
pub async fn create_turn(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
    Json(body): Json<TurnRequest>,
) -> Result<Response, AppError> {
    let no_stream = headers
        .get(NO_STREAM_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("true"));

    if no_stream {
        let outcome = state
            .turns
            .buffered_turn(user.user_id, body.chat_id, &body.message)
            .await?;
        return Ok(Json(BufferedTurnResponse {
            chat_id: outcome.chat.id,
            message: outcome.assistant_message,
            stop_reason: outcome.stop_reason,
        })
        .into_response());
    }

    let streamed = state
        .turns
        .streamed_turn(user.user_id, body.chat_id, &body.message)
        .await?;
    let chat_id = streamed.chat.id;
    let mut events = streamed.events;

    let sse_stream = async_stream::stream! {
        let chat_json = json!({ "chat_id": chat_id });
        yield Ok::<_, Infallible>(Event::default().event("chat").data(chat_json.to_string()));

        while let Some(event) = events.recv().await {
            match event {
                TurnEvent::Delta { text } => {
                    let data = json!({ "text": text });
                    yield Ok(Event::default().event("text_delta").data(data.to_string()));
                }
                TurnEvent::Completed { message, stop_reason } => {
                    let data = json!({
                        "message": message,
                        "stop_reason": stop_reason,
                    });
                    yield Ok(Event::default().event("message").data(data.to_string()));
                    yield Ok(Event::default().event("done").data("{}"));
                }
                TurnEvent::Failed { message } => {
                    // No terminal `done`: a truncated stream is an error.
                    let data = json!({ "message": message });
                    yield Ok(Event::default().event("error").data(data.to_string()));
                }
            }
        }
    };

    Ok(Sse::new(sse_stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response())
}

/// GET /api/chat?chat_id=
pub async fn load_chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LoadChatQuery>,
) -> Result<Json<LoadChatResponse>, AppError> {
    let chat = state.chats.get_chat(&query.chat_id, &user.user_id).await?;
    let messages = state.chats.messages(&chat.id, &user.user_id).await?;
    Ok(Json(LoadChatResponse {
        chat_id: chat.id,
        chat_name: chat.name,
        messages,
    }))
}
