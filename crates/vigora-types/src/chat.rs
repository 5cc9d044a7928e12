//! Chat and message types.
//!
//! A chat is a named, user-owned conversation container; messages are
//! immutable turns within it, ordered by creation time. The chat's
//! `updated_at` is bumped whenever a message is appended and drives the
//! most-recently-active-first ordering of the chat list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name given to chats created without an explicit name.
pub const DEFAULT_CHAT_NAME: &str = "Novo Chat";

/// Maximum length of a chat name, in characters.
pub const MAX_CHAT_NAME_LEN: usize = 50;

/// Maximum length of a single user message, in characters.
pub const MAX_MESSAGE_LEN: usize = 1000;

/// A conversation container owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One turn in a chat. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub content: String,
    /// True for the user's own messages, false for assistant replies.
    pub is_user: bool,
    pub created_at: DateTime<Utc>,
}

/// A chat with its most recent message, for list previews.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOverview {
    #[serde(flatten)]
    pub chat: Chat,
    pub last_message: Option<ChatMessage>,
}
