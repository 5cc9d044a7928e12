//! User profile endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use vigora_types::user::{ProfileUpdate, UserProfile};

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::state::AppState;

/// GET /api/user/profile
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state.profiles.get(&user.user_id).await?;
    Ok(Json(profile))
}

/// PATCH /api/user/profile -- partial update of name, email, activity goal.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state.profiles.update(&user.user_id, body).await?;
    Ok(Json(profile))
}

/// DELETE /api/user/account -- delete the account; chats, messages,
/// activities and sessions cascade.
pub async fn delete_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AppError> {
    state.profiles.delete_account(&user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
