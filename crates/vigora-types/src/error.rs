use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in vigora-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from authentication and session operations.
///
/// Every validation failure collapses to [`AuthError::Unauthenticated`]:
/// callers cannot distinguish a missing token from an expired one.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid or expired session")]
    Unauthenticated,

    #[error("email '{0}' is already registered")]
    EmailTaken(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for AuthError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => AuthError::Unauthenticated,
            RepositoryError::Conflict(msg) => AuthError::EmailTaken(msg),
            other => AuthError::Storage(other.to_string()),
        }
    }
}

/// Errors from chat operations.
///
/// `NotFound` and `Forbidden` are deliberately distinct here even though the
/// HTTP surface collapses them: the distinction matters for logging and tests.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat not found")]
    NotFound,

    #[error("chat belongs to another user")]
    Forbidden,

    #[error("invalid chat name: {0}")]
    InvalidName(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ChatError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => ChatError::NotFound,
            other => ChatError::Storage(other.to_string()),
        }
    }
}

/// Errors from activity operations.
#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("activity not found")]
    NotFound,

    #[error("activity belongs to another user")]
    Forbidden,

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ActivityError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => ActivityError::NotFound,
            other => ActivityError::Storage(other.to_string()),
        }
    }
}

/// Errors from profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("user not found")]
    NotFound,

    #[error("email '{0}' is already registered")]
    EmailTaken(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ProfileError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => ProfileError::NotFound,
            RepositoryError::Conflict(msg) => ProfileError::EmailTaken(msg),
            other => ProfileError::Storage(other.to_string()),
        }
    }
}

/// Errors from a chat turn (the full user-message-to-assistant-reply cycle).
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("model call failed: {0}")]
    Upstream(#[from] LlmError),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for TurnError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => TurnError::Chat(ChatError::NotFound),
            other => TurnError::Storage(other.to_string()),
        }
    }
}
