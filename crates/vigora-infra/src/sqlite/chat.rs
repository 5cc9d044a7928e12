//! SQLite chat repository implementation.
//!
//! Implements `ChatRepository` from `vigora-core`. Appending a message and
//! bumping the chat's `updated_at` happen in one transaction so the chat
//! list ordering never lags behind its own messages.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use vigora_core::repository::chat::ChatRepository;
use vigora_types::chat::{Chat, ChatMessage};
use vigora_types::error::RepositoryError;

use super::pool::DatabasePool;
use super::user::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `ChatRepository`.
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Chat.
struct ChatRow {
    id: String,
    user_id: String,
    name: String,
    created_at: String,
    updated_at: String,
}

impl ChatRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_chat(self) -> Result<Chat, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid chat id: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| RepositoryError::Query(format!("invalid user_id: {e}")))?;
        Ok(Chat {
            id,
            user_id,
            name: self.name,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

/// Internal row type for mapping SQLite rows to domain ChatMessage.
struct MessageRow {
    id: String,
    chat_id: String,
    content: String,
    is_user: bool,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            content: row.try_get("content")?,
            is_user: row.try_get("is_user")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let chat_id = Uuid::parse_str(&self.chat_id)
            .map_err(|e| RepositoryError::Query(format!("invalid chat_id: {e}")))?;
        Ok(ChatMessage {
            id,
            chat_id,
            content: self.content,
            is_user: self.is_user,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn rows_to_messages(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<ChatMessage>, RepositoryError> {
    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let msg_row = MessageRow::from_row(row)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        messages.push(msg_row.into_message()?);
    }
    Ok(messages)
}

impl ChatRepository for SqliteChatRepository {
    async fn create(&self, chat: &Chat) -> Result<Chat, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO chats (id, user_id, name, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(chat.id.to_string())
        .bind(chat.user_id.to_string())
        .bind(&chat.name)
        .bind(format_datetime(&chat.created_at))
        .bind(format_datetime(&chat.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(chat.clone())
    }

    async fn get(&self, chat_id: &Uuid) -> Result<Option<Chat>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chats WHERE id = ?")
            .bind(chat_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let chat_row = ChatRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(chat_row.into_chat()?))
            }
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: &Uuid) -> Result<Vec<Chat>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM chats WHERE user_id = ? ORDER BY updated_at DESC, id DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in &rows {
            let chat_row = ChatRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            chats.push(chat_row.into_chat()?);
        }
        Ok(chats)
    }

    async fn rename(
        &self,
        chat_id: &Uuid,
        name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE chats SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(format_datetime(&updated_at))
            .bind(chat_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete(&self, chat_id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(chat_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn save_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO chat_messages (id, chat_id, content, is_user, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.chat_id.to_string())
        .bind(&message.content)
        .bind(message.is_user)
        .bind(format_datetime(&message.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let bumped = sqlx::query("UPDATE chats SET updated_at = ? WHERE id = ?")
            .bind(format_datetime(&message.created_at))
            .bind(message.chat_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if bumped.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn messages(&self, chat_id: &Uuid) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM chat_messages WHERE chat_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(chat_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_messages(&rows)
    }

    async fn recent_messages(
        &self,
        chat_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        // Newest N first, then flipped back to oldest-first for the caller.
        let rows = sqlx::query(
            r#"SELECT * FROM chat_messages WHERE chat_id = ?
               ORDER BY created_at DESC, id DESC LIMIT ?"#,
        )
        .bind(chat_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = rows_to_messages(&rows)?;
        messages.reverse();
        Ok(messages)
    }

    async fn latest_message(
        &self,
        chat_id: &Uuid,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT * FROM chat_messages WHERE chat_id = ?
               ORDER BY created_at DESC, id DESC LIMIT 1"#,
        )
        .bind(chat_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let msg_row = MessageRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(msg_row.into_message()?))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    async fn seed_user(pool: &DatabasePool) -> Uuid {
        let user_id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id.to_string())
        .bind(format!("{user_id}@example.com"))
        .bind("Ana")
        .bind("$argon2id$stub")
        .bind(Utc::now().to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&pool.writer)
        .await
        .unwrap();
        user_id
    }

    fn make_chat(user_id: Uuid, name: &str) -> Chat {
        let now = Utc::now();
        Chat {
            id: Uuid::now_v7(),
            user_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn make_message(chat_id: Uuid, content: &str, is_user: bool) -> ChatMessage {
        ChatMessage {
            id: Uuid::now_v7(),
            chat_id,
            content: content.to_string(),
            is_user,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_chat() {
        let pool = test_pool().await;
        let repo = SqliteChatRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;

        let chat = make_chat(user_id, "Novo Chat");
        repo.create(&chat).await.unwrap();

        let found = repo.get(&chat.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Novo Chat");
        assert_eq!(found.user_id, user_id);

        assert!(repo.get(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_message_bumps_updated_at() {
        let pool = test_pool().await;
        let repo = SqliteChatRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;

        let chat = make_chat(user_id, "Novo Chat");
        repo.create(&chat).await.unwrap();

        let message = make_message(chat.id, "Oi", true);
        repo.save_message(&message).await.unwrap();

        let found = repo.get(&chat.id).await.unwrap().unwrap();
        assert_eq!(found.updated_at, message.created_at);
        assert!(found.updated_at > chat.updated_at);
    }

    #[tokio::test]
    async fn test_save_message_for_missing_chat_rolls_back() {
        let pool = test_pool().await;
        let repo = SqliteChatRepository::new(pool.clone());

        // No chat row: the FK rejects the insert, or the bump touches 0 rows;
        // either way nothing is persisted.
        let message = make_message(Uuid::now_v7(), "Oi", true);
        assert!(repo.save_message(&message).await.is_err());

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_messages")
            .fetch_one(&pool.reader)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn test_messages_ascending_and_windows() {
        let pool = test_pool().await;
        let repo = SqliteChatRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;

        let chat = make_chat(user_id, "Novo Chat");
        repo.create(&chat).await.unwrap();

        for i in 0..12 {
            repo.save_message(&make_message(chat.id, &format!("m{i}"), i % 2 == 0))
                .await
                .unwrap();
        }

        let all = repo.messages(&chat.id).await.unwrap();
        assert_eq!(all.len(), 12);
        assert_eq!(all[0].content, "m0");
        assert_eq!(all[11].content, "m11");
        assert!(all.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        let recent = repo.recent_messages(&chat.id, 10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].content, "m2");
        assert_eq!(recent[9].content, "m11");

        let latest = repo.latest_message(&chat.id).await.unwrap().unwrap();
        assert_eq!(latest.content, "m11");
    }

    #[tokio::test]
    async fn test_list_for_user_orders_by_activity() {
        let pool = test_pool().await;
        let repo = SqliteChatRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let other_user = seed_user(&pool).await;

        let older = make_chat(user_id, "older");
        let newer = make_chat(user_id, "newer");
        let foreign = make_chat(other_user, "foreign");
        repo.create(&older).await.unwrap();
        repo.create(&newer).await.unwrap();
        repo.create(&foreign).await.unwrap();

        // Activity on the older chat promotes it to the top.
        repo.save_message(&make_message(older.id, "Oi", true))
            .await
            .unwrap();

        let list = repo.list_for_user(&user_id).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, older.id);
        assert_eq!(list[1].id, newer.id);
    }

    #[tokio::test]
    async fn test_delete_chat_cascades_messages() {
        let pool = test_pool().await;
        let repo = SqliteChatRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;

        let chat = make_chat(user_id, "Novo Chat");
        repo.create(&chat).await.unwrap();
        repo.save_message(&make_message(chat.id, "Oi", true))
            .await
            .unwrap();

        repo.delete(&chat.id).await.unwrap();

        assert!(repo.get(&chat.id).await.unwrap().is_none());
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_messages")
            .fetch_one(&pool.reader)
            .await
            .unwrap();
        assert_eq!(count.0, 0);

        let err = repo.delete(&chat.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_rename_sets_name_and_updated_at() {
        let pool = test_pool().await;
        let repo = SqliteChatRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;

        let chat = make_chat(user_id, "Novo Chat");
        repo.create(&chat).await.unwrap();

        let later = Utc::now();
        repo.rename(&chat.id, "Treino de pernas", later).await.unwrap();

        let found = repo.get(&chat.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Treino de pernas");
        assert_eq!(found.updated_at, later);

        let err = repo
            .rename(&Uuid::now_v7(), "ghost", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
