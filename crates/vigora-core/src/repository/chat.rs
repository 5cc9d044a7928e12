//! ChatRepository trait definition.
//!
//! Provides CRUD operations for chats and their messages. Ownership checks
//! (NotFound vs Forbidden) are the chat service's responsibility; the
//! repository works on raw ids.

use uuid::Uuid;
use vigora_types::chat::{Chat, ChatMessage};
use vigora_types::error::RepositoryError;

/// Repository trait for chat and message persistence.
///
/// Implementations live in vigora-infra (e.g., `SqliteChatRepository`).
pub trait ChatRepository: Send + Sync {
    /// Create a new chat.
    fn create(
        &self,
        chat: &Chat,
    ) -> impl std::future::Future<Output = Result<Chat, RepositoryError>> + Send;

    /// Get a chat by its unique id.
    fn get(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, RepositoryError>> + Send;

    /// List a user's chats ordered by updated_at DESC (most recently active first).
    fn list_for_user(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Chat>, RepositoryError>> + Send;

    /// Rename a chat and set its updated_at. Fails with `NotFound` when absent.
    fn rename(
        &self,
        chat_id: &Uuid,
        name: &str,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a chat and (via cascade) its messages.
    fn delete(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Append a message and bump the chat's updated_at in one transaction.
    fn save_message(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All messages of a chat, ordered by created_at ASC.
    fn messages(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// The most recent `limit` messages of a chat, returned oldest-first.
    fn recent_messages(
        &self,
        chat_id: &Uuid,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// The single most recent message of a chat, for list previews.
    fn latest_message(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatMessage>, RepositoryError>> + Send;
}
