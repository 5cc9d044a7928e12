//! Authentication endpoints: register, login, refresh, logout, session.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vigora_core::auth::service::IssuedSession;
use vigora_types::user::UserProfile;

use crate::http::error::AppError;
use crate::http::extractors::auth::{CurrentUser, bearer_value};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued credentials: the profile plus the bearer token and its expiry.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserProfile,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedSession> for SessionResponse {
    fn from(issued: IssuedSession) -> Self {
        Self {
            user: issued.user.profile(),
            token: issued.session.token,
            expires_at: issued.session.expires_at,
        }
    }
}

/// The validated caller, as returned by GET /api/auth/session.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let issued = state
        .auth
        .register(&body.name, &body.email, &body.password)
        .await?;
    Ok((StatusCode::CREATED, Json(issued.into())))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let issued = state.auth.login(&body.email, &body.password).await?;
    Ok(Json(issued.into()))
}

/// POST /api/auth/refresh -- rotate the presented token.
pub async fn refresh(
    State(state): State<AppState>,
    parts: Parts,
) -> Result<Json<SessionResponse>, AppError> {
    let bearer = bearer_value(&parts)?;
    let issued = state.auth.refresh(bearer).await?;
    Ok(Json(issued.into()))
}

/// POST /api/auth/logout -- invalidate the presented token.
pub async fn logout(State(state): State<AppState>, parts: Parts) -> Result<StatusCode, AppError> {
    let bearer = bearer_value(&parts)?;
    state.auth.logout(bearer).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/session -- who am I.
pub async fn session(CurrentUser(user): CurrentUser) -> Json<SessionInfo> {
    Json(SessionInfo {
        user_id: user.user_id,
        email: user.email,
        name: user.name,
        session_id: user.session.id,
        expires_at: user.session.expires_at,
    })
}
