//! Application error type mapping domain errors to HTTP responses.
//!
//! Cross-user access (`Forbidden`) maps to the same 404 as `NotFound`: the
//! API never confirms that someone else's resource exists. The distinction
//! is preserved in the domain error and surfaces in logs only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use vigora_types::error::{ActivityError, AuthError, ChatError, ProfileError, TurnError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Auth(AuthError),
    Chat(ChatError),
    Activity(ActivityError),
    Profile(ProfileError),
    Turn(TurnError),
    Validation(String),
    Internal(String),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<ActivityError> for AppError {
    fn from(e: ActivityError) -> Self {
        AppError::Activity(e)
    }
}

impl From<ProfileError> for AppError {
    fn from(e: ProfileError) -> Self {
        AppError::Profile(e)
    }
}

impl From<TurnError> for AppError {
    fn from(e: TurnError) -> Self {
        AppError::Turn(e)
    }
}

fn chat_error_parts(e: &ChatError) -> (StatusCode, &'static str, String) {
    match e {
        ChatError::NotFound => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", "chat not found".to_string())
        }
        ChatError::Forbidden => {
            // Existence hiding: same response as NotFound.
            tracing::warn!("cross-user chat access blocked");
            (StatusCode::NOT_FOUND, "NOT_FOUND", "chat not found".to_string())
        }
        ChatError::InvalidName(msg) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        ChatError::Storage(msg) => {
            tracing::error!(error = %msg, "chat storage error");
            internal()
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "internal server error".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Auth(AuthError::Unauthenticated) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "invalid or expired session".to_string(),
            ),
            AppError::Auth(AuthError::EmailTaken(email)) => (
                StatusCode::CONFLICT,
                "EMAIL_TAKEN",
                format!("email '{email}' is already registered"),
            ),
            AppError::Auth(AuthError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Auth(AuthError::Storage(msg)) => {
                tracing::error!(error = %msg, "auth storage error");
                internal()
            }
            AppError::Chat(e) => chat_error_parts(e),
            AppError::Activity(ActivityError::NotFound) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "activity not found".to_string(),
            ),
            AppError::Activity(ActivityError::Forbidden) => {
                tracing::warn!("cross-user activity access blocked");
                (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "activity not found".to_string(),
                )
            }
            AppError::Activity(ActivityError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Activity(ActivityError::Storage(msg)) => {
                tracing::error!(error = %msg, "activity storage error");
                internal()
            }
            AppError::Profile(ProfileError::NotFound) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "user not found".to_string(),
            ),
            AppError::Profile(ProfileError::EmailTaken(email)) => (
                StatusCode::CONFLICT,
                "EMAIL_TAKEN",
                format!("email '{email}' is already registered"),
            ),
            AppError::Profile(ProfileError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Profile(ProfileError::Storage(msg)) => {
                tracing::error!(error = %msg, "profile storage error");
                internal()
            }
            AppError::Turn(TurnError::Chat(e)) => chat_error_parts(e),
            AppError::Turn(TurnError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Turn(TurnError::Upstream(e)) => {
                // Details stay in the logs; the caller gets a generic error.
                tracing::error!(error = %e, "model call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "assistant is unavailable".to_string(),
                )
            }
            AppError::Turn(TurnError::Storage(msg)) => {
                tracing::error!(error = %msg, "turn storage error");
                internal()
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                internal()
            }
        };

        let body = json!({
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
