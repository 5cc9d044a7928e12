//! Chat CRUD service.
//!
//! Every operation takes the calling user's id and enforces ownership as an
//! access-control gate, not just a lookup: a chat that exists but belongs to
//! someone else is `Forbidden`, distinct from `NotFound` at this layer even
//! though the HTTP surface collapses both to 404.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use vigora_types::chat::{
    Chat, ChatMessage, ChatOverview, DEFAULT_CHAT_NAME, MAX_CHAT_NAME_LEN,
};
use vigora_types::error::ChatError;

use crate::repository::chat::ChatRepository;

/// Orchestrates chat lifecycle and message persistence.
pub struct ChatService<C: ChatRepository> {
    chats: C,
}

impl<C: ChatRepository> ChatService<C> {
    pub fn new(chats: C) -> Self {
        Self { chats }
    }

    // --- Chat lifecycle ---

    /// Create a chat for `user_id`. A missing or blank name falls back to
    /// the default; an over-long one is rejected.
    pub async fn create_chat(
        &self,
        user_id: Uuid,
        name: Option<String>,
    ) -> Result<Chat, ChatError> {
        let name = match name.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_CHAT_NAME.to_string(),
            Some(given) => validate_name(given)?,
        };

        let now = Utc::now();
        let chat = Chat {
            id: Uuid::now_v7(),
            user_id,
            name,
            created_at: now,
            updated_at: now,
        };

        let chat = self.chats.create(&chat).await?;
        info!(chat_id = %chat.id, "chat created");
        Ok(chat)
    }

    /// Fetch a chat, enforcing ownership.
    pub async fn get_chat(&self, chat_id: &Uuid, user_id: &Uuid) -> Result<Chat, ChatError> {
        let chat = self.chats.get(chat_id).await?.ok_or(ChatError::NotFound)?;
        if chat.user_id != *user_id {
            return Err(ChatError::Forbidden);
        }
        Ok(chat)
    }

    /// A user's chats, most recently active first, each with its latest
    /// message for preview.
    pub async fn list_chats(&self, user_id: &Uuid) -> Result<Vec<ChatOverview>, ChatError> {
        let chats = self.chats.list_for_user(user_id).await?;

        let mut overviews = Vec::with_capacity(chats.len());
        for chat in chats {
            let last_message = self.chats.latest_message(&chat.id).await?;
            overviews.push(ChatOverview { chat, last_message });
        }
        Ok(overviews)
    }

    /// Rename a chat. The new name must be 1..=50 characters after trimming.
    pub async fn rename_chat(
        &self,
        chat_id: &Uuid,
        user_id: &Uuid,
        name: &str,
    ) -> Result<Chat, ChatError> {
        self.get_chat(chat_id, user_id).await?;
        let name = validate_name(name.trim())?;

        let updated_at = Utc::now();
        self.chats.rename(chat_id, &name, updated_at).await?;
        self.get_chat(chat_id, user_id).await
    }

    /// Delete a chat and its messages.
    pub async fn delete_chat(&self, chat_id: &Uuid, user_id: &Uuid) -> Result<(), ChatError> {
        self.get_chat(chat_id, user_id).await?;
        self.chats.delete(chat_id).await?;
        info!(chat_id = %chat_id, "chat deleted");
        Ok(())
    }

    // --- Messages ---

    /// Full message history, ascending by creation time.
    pub async fn messages(
        &self,
        chat_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        self.get_chat(chat_id, user_id).await?;
        Ok(self.chats.messages(chat_id).await?)
    }

    /// The most recent `limit` messages, oldest-first. Ownership must have
    /// been established by the caller.
    pub(crate) async fn recent_messages(
        &self,
        chat_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self.chats.recent_messages(chat_id, limit).await?)
    }

    /// Append a message and bump the chat's updated_at. Ownership must have
    /// been established by the caller; messages are immutable once written.
    pub(crate) async fn append_message(
        &self,
        chat_id: Uuid,
        content: String,
        is_user: bool,
    ) -> Result<ChatMessage, ChatError> {
        let message = ChatMessage {
            id: Uuid::now_v7(),
            chat_id,
            content,
            is_user,
            created_at: Utc::now(),
        };
        self.chats.save_message(&message).await?;
        Ok(message)
    }
}

fn validate_name(name: &str) -> Result<String, ChatError> {
    if name.is_empty() {
        return Err(ChatError::InvalidName("name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_CHAT_NAME_LEN {
        return Err(ChatError::InvalidName(format!(
            "name cannot exceed {MAX_CHAT_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryChatRepository;

    fn service() -> ChatService<InMemoryChatRepository> {
        ChatService::new(InMemoryChatRepository::default())
    }

    #[tokio::test]
    async fn test_create_chat_default_name() {
        let chats = service();
        let user = Uuid::now_v7();

        let chat = chats.create_chat(user, None).await.unwrap();
        assert_eq!(chat.name, DEFAULT_CHAT_NAME);

        let blank = chats.create_chat(user, Some("   ".to_string())).await.unwrap();
        assert_eq!(blank.name, DEFAULT_CHAT_NAME);
    }

    #[tokio::test]
    async fn test_create_chat_rejects_over_long_name() {
        let chats = service();
        let err = chats
            .create_chat(Uuid::now_v7(), Some("x".repeat(51)))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_get_chat_distinguishes_not_found_and_forbidden() {
        let chats = service();
        let owner = Uuid::now_v7();
        let stranger = Uuid::now_v7();
        let chat = chats.create_chat(owner, None).await.unwrap();

        assert!(matches!(
            chats.get_chat(&Uuid::now_v7(), &owner).await.unwrap_err(),
            ChatError::NotFound
        ));
        assert!(matches!(
            chats.get_chat(&chat.id, &stranger).await.unwrap_err(),
            ChatError::Forbidden
        ));
    }

    #[tokio::test]
    async fn test_rename_validates_and_persists() {
        let chats = service();
        let owner = Uuid::now_v7();
        let chat = chats.create_chat(owner, None).await.unwrap();

        let err = chats.rename_chat(&chat.id, &owner, "  ").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidName(_)));
        // Name unchanged in storage after the failed rename
        let unchanged = chats.get_chat(&chat.id, &owner).await.unwrap();
        assert_eq!(unchanged.name, DEFAULT_CHAT_NAME);

        let renamed = chats
            .rename_chat(&chat.id, &owner, "Treino de pernas")
            .await
            .unwrap();
        assert_eq!(renamed.name, "Treino de pernas");
        assert!(renamed.updated_at >= chat.updated_at);
    }

    #[tokio::test]
    async fn test_cross_user_rename_and_delete_fail() {
        let chats = service();
        let owner = Uuid::now_v7();
        let stranger = Uuid::now_v7();
        let chat = chats.create_chat(owner, None).await.unwrap();

        assert!(matches!(
            chats
                .rename_chat(&chat.id, &stranger, "hijacked")
                .await
                .unwrap_err(),
            ChatError::Forbidden
        ));
        assert!(matches!(
            chats.delete_chat(&chat.id, &stranger).await.unwrap_err(),
            ChatError::Forbidden
        ));

        // Still intact for the owner
        assert!(chats.get_chat(&chat.id, &owner).await.is_ok());
    }

    #[tokio::test]
    async fn test_messages_ascending_and_idempotent() {
        let chats = service();
        let owner = Uuid::now_v7();
        let chat = chats.create_chat(owner, None).await.unwrap();

        chats
            .append_message(chat.id, "primeira".to_string(), true)
            .await
            .unwrap();
        chats
            .append_message(chat.id, "segunda".to_string(), false)
            .await
            .unwrap();
        chats
            .append_message(chat.id, "terceira".to_string(), true)
            .await
            .unwrap();

        let first = chats.messages(&chat.id, &owner).await.unwrap();
        assert_eq!(first.len(), 3);
        assert!(first.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        let second = chats.messages(&chat.id, &owner).await.unwrap();
        let ids: Vec<_> = first.iter().map(|m| m.id).collect();
        let ids_again: Vec<_> = second.iter().map(|m| m.id).collect();
        assert_eq!(ids, ids_again);
    }

    #[tokio::test]
    async fn test_append_bumps_updated_at_and_orders_list() {
        let chats = service();
        let owner = Uuid::now_v7();
        let older = chats.create_chat(owner, Some("older".to_string())).await.unwrap();
        let newer = chats.create_chat(owner, Some("newer".to_string())).await.unwrap();

        // Appending to the older chat makes it the most recently active.
        chats
            .append_message(older.id, "oi".to_string(), true)
            .await
            .unwrap();

        let list = chats.list_chats(&owner).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].chat.id, older.id);
        assert_eq!(list[1].chat.id, newer.id);
        assert_eq!(list[0].last_message.as_ref().unwrap().content, "oi");
        assert!(list[1].last_message.is_none());

        let bumped = chats.get_chat(&older.id, &owner).await.unwrap();
        assert!(bumped.updated_at > older.updated_at);
    }
}
