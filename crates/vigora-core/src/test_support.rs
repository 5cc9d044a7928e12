//! In-memory repository and provider doubles shared by service tests.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::Stream;
use uuid::Uuid;

use vigora_types::activity::Activity;
use vigora_types::auth::AuthSession;
use vigora_types::chat::{Chat, ChatMessage};
use vigora_types::error::{AuthError, RepositoryError};
use vigora_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, StreamEvent,
};
use vigora_types::user::User;

use crate::auth::password::PasswordHasher;
use crate::llm::provider::LlmProvider;
use crate::repository::activity::ActivityRepository;
use crate::repository::chat::ChatRepository;
use crate::repository::session::SessionRepository;
use crate::repository::user::UserRepository;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict(user.email.clone()));
        }
        users.push(user.clone());
        Ok(user.clone())
    }

    async fn find_by_id(&self, user_id: &Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == *user_id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(RepositoryError::Conflict(user.email.clone()));
        }
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, user_id: &Uuid) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != *user_id);
        if users.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: Mutex<Vec<AuthSession>>,
}

impl InMemorySessionRepository {
    /// Test helper: rewrite a session's expiry in place.
    pub fn set_expiry(&self, token: &str, expires_at: DateTime<Utc>) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.iter_mut().find(|s| s.token == token) {
            session.expires_at = expires_at;
        }
    }
}

impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, session: &AuthSession) -> Result<AuthSession, RepositoryError> {
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session.clone())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<AuthSession>, RepositoryError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.token == token)
            .cloned())
    }

    async fn delete_by_token(&self, token: &str) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.token != token);
        if sessions.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn rotate(
        &self,
        old_token: &str,
        replacement: &AuthSession,
    ) -> Result<AuthSession, RepositoryError> {
        let mut sessions = self.sessions.lock().unwrap();
        if !sessions.iter().any(|s| s.token == old_token) {
            return Err(RepositoryError::NotFound);
        }
        sessions.retain(|s| s.token != old_token);
        sessions.push(replacement.clone());
        Ok(replacement.clone())
    }
}

// ---------------------------------------------------------------------------
// Chats
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryChatRepository {
    chats: Mutex<Vec<Chat>>,
    messages: Mutex<Vec<ChatMessage>>,
}

impl ChatRepository for InMemoryChatRepository {
    async fn create(&self, chat: &Chat) -> Result<Chat, RepositoryError> {
        self.chats.lock().unwrap().push(chat.clone());
        Ok(chat.clone())
    }

    async fn get(&self, chat_id: &Uuid) -> Result<Option<Chat>, RepositoryError> {
        Ok(self
            .chats
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == *chat_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: &Uuid) -> Result<Vec<Chat>, RepositoryError> {
        let mut chats: Vec<Chat> = self
            .chats
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == *user_id)
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(chats)
    }

    async fn rename(
        &self,
        chat_id: &Uuid,
        name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut chats = self.chats.lock().unwrap();
        match chats.iter_mut().find(|c| c.id == *chat_id) {
            Some(chat) => {
                chat.name = name.to_string();
                chat.updated_at = updated_at;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, chat_id: &Uuid) -> Result<(), RepositoryError> {
        let mut chats = self.chats.lock().unwrap();
        let before = chats.len();
        chats.retain(|c| c.id != *chat_id);
        if chats.len() == before {
            return Err(RepositoryError::NotFound);
        }
        self.messages.lock().unwrap().retain(|m| m.chat_id != *chat_id);
        Ok(())
    }

    async fn save_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        self.messages.lock().unwrap().push(message.clone());
        let mut chats = self.chats.lock().unwrap();
        match chats.iter_mut().find(|c| c.id == message.chat_id) {
            Some(chat) => {
                chat.updated_at = message.created_at;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn messages(&self, chat_id: &Uuid) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut messages: Vec<ChatMessage> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == *chat_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(messages)
    }

    async fn recent_messages(
        &self,
        chat_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let all = self.messages(chat_id).await?;
        let skip = all.len().saturating_sub(limit as usize);
        Ok(all.into_iter().skip(skip).collect())
    }

    async fn latest_message(
        &self,
        chat_id: &Uuid,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        Ok(self.messages(chat_id).await?.pop())
    }
}

// ---------------------------------------------------------------------------
// Activities
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryActivityRepository {
    activities: Mutex<Vec<Activity>>,
}

impl ActivityRepository for InMemoryActivityRepository {
    async fn create(&self, activity: &Activity) -> Result<Activity, RepositoryError> {
        self.activities.lock().unwrap().push(activity.clone());
        Ok(activity.clone())
    }

    async fn get(&self, activity_id: &Uuid) -> Result<Option<Activity>, RepositoryError> {
        Ok(self
            .activities
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == *activity_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: &Uuid) -> Result<Vec<Activity>, RepositoryError> {
        let mut activities: Vec<Activity> = self
            .activities
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == *user_id)
            .cloned()
            .collect();
        activities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(activities)
    }

    async fn update(&self, activity: &Activity) -> Result<(), RepositoryError> {
        let mut activities = self.activities.lock().unwrap();
        match activities.iter_mut().find(|a| a.id == activity.id) {
            Some(existing) => {
                *existing = activity.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, activity_id: &Uuid) -> Result<(), RepositoryError> {
        let mut activities = self.activities.lock().unwrap();
        let before = activities.len();
        activities.retain(|a| a.id != *activity_id);
        if activities.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn count_for_user(&self, user_id: &Uuid) -> Result<u64, RepositoryError> {
        Ok(self
            .activities
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == *user_id)
            .count() as u64)
    }

    async fn count_since(
        &self,
        user_id: &Uuid,
        since: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        Ok(self
            .activities
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == *user_id && a.created_at >= since)
            .count() as u64)
    }

    async fn recent(&self, user_id: &Uuid, limit: i64) -> Result<Vec<Activity>, RepositoryError> {
        let mut activities = self.list_for_user(user_id).await?;
        activities.truncate(limit as usize);
        Ok(activities)
    }
}

// ---------------------------------------------------------------------------
// Password hashing
// ---------------------------------------------------------------------------

/// Transparent "hasher" for tests. Never use outside test code.
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        Ok(format!("plain:{password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        Ok(hash == format!("plain:{password}"))
    }
}

// ---------------------------------------------------------------------------
// LLM provider
// ---------------------------------------------------------------------------

/// One scripted reply from the provider double.
pub enum ScriptedReply {
    /// `complete` returns this text with `StopReason::Stop`.
    Text(String),
    /// `complete` fails with this error.
    Failure(LlmError),
    /// `stream` yields exactly these events.
    Stream(Vec<Result<StreamEvent, LlmError>>),
}

/// Provider double replaying a script and recording every request.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<ScriptedReply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request the coordinator sent, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self) -> ScriptedReply {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("provider script exhausted")
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.next_reply();
        // Simulated network latency so concurrency tests have a window
        // in which interleaving could occur.
        tokio::time::sleep(Duration::from_millis(20)).await;
        match reply {
            ScriptedReply::Text(content) => Ok(CompletionResponse {
                content,
                stop_reason: StopReason::Stop,
                usage: None,
            }),
            ScriptedReply::Failure(err) => Err(err),
            ScriptedReply::Stream(_) => panic!("scripted stream reply used with complete()"),
        }
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        self.requests.lock().unwrap().push(request);
        match self.next_reply() {
            ScriptedReply::Stream(events) => Box::pin(futures_util::stream::iter(events)),
            ScriptedReply::Text(content) => Box::pin(futures_util::stream::iter(vec![
                Ok(StreamEvent::TextDelta { text: content }),
                Ok(StreamEvent::MessageDelta {
                    stop_reason: StopReason::Stop,
                }),
                Ok(StreamEvent::Done),
            ])),
            ScriptedReply::Failure(err) => Box::pin(futures_util::stream::iter(vec![Err(err)])),
        }
    }
}
