//! Activity CRUD and stats endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use vigora_core::activity::service::ActivityInput;
use vigora_types::activity::{Activity, ActivityIntensity, ActivityStats};

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::state::AppState;

/// Create/update payload. An out-of-range intensity is rejected at
/// deserialization, before any storage call.
#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    pub name: String,
    pub intensity: ActivityIntensity,
    pub duration: String,
    pub emoji: Option<String>,
}

impl From<ActivityRequest> for ActivityInput {
    fn from(body: ActivityRequest) -> Self {
        ActivityInput {
            name: body.name,
            intensity: body.intensity,
            duration: body.duration,
            emoji: body.emoji,
        }
    }
}

/// POST /api/activities
pub async fn create_activity(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<ActivityRequest>,
) -> Result<(StatusCode, Json<Activity>), AppError> {
    let activity = state.activities.create(user.user_id, body.into()).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

/// GET /api/activities -- most recent first.
pub async fn list_activities(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Activity>>, AppError> {
    let activities = state.activities.list(&user.user_id).await?;
    Ok(Json(activities))
}

/// GET /api/activities/stats
pub async fn activity_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ActivityStats>, AppError> {
    let stats = state.activities.stats(&user.user_id).await?;
    Ok(Json(stats))
}

/// PATCH /api/activities/{id}
pub async fn update_activity(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(activity_id): Path<Uuid>,
    Json(body): Json<ActivityRequest>,
) -> Result<Json<Activity>, AppError> {
    let activity = state
        .activities
        .update(&activity_id, &user.user_id, body.into())
        .await?;
    Ok(Json(activity))
}

/// DELETE /api/activities/{id}
pub async fn delete_activity(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(activity_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.activities.delete(&activity_id, &user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
