//! Chat CRUD endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vigora_types::chat::{Chat, ChatMessage, ChatOverview};

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameChatRequest {
    pub name: String,
}

/// A chat with its full message history, ascending.
#[derive(Debug, Serialize)]
pub struct ChatDetail {
    #[serde(flatten)]
    pub chat: Chat,
    pub messages: Vec<ChatMessage>,
}

/// POST /api/chats
pub async fn create_chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<Chat>), AppError> {
    let chat = state.chats.create_chat(user.user_id, body.name).await?;
    Ok((StatusCode::CREATED, Json(chat)))
}

/// GET /api/chats -- most recently active first, with last-message previews.
pub async fn list_chats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ChatOverview>>, AppError> {
    let chats = state.chats.list_chats(&user.user_id).await?;
    Ok(Json(chats))
}

/// GET /api/chats/{id}
pub async fn get_chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(chat_id): Path<Uuid>,
) -> Result<Json<ChatDetail>, AppError> {
    let chat = state.chats.get_chat(&chat_id, &user.user_id).await?;
    let messages = state.chats.messages(&chat_id, &user.user_id).await?;
    Ok(Json(ChatDetail { chat, messages }))
}

/// GET /api/chats/{id}/messages
pub async fn get_messages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(chat_id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let messages = state.chats.messages(&chat_id, &user.user_id).await?;
    Ok(Json(messages))
}

/// PATCH /api/chats/{id}
pub async fn rename_chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(chat_id): Path<Uuid>,
    Json(body): Json<RenameChatRequest>,
) -> Result<Json<Chat>, AppError> {
    let chat = state
        .chats
        .rename_chat(&chat_id, &user.user_id, &body.name)
        .await?;
    Ok(Json(chat))
}

/// DELETE /api/chats/{id}
pub async fn delete_chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(chat_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.chats.delete_chat(&chat_id, &user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
