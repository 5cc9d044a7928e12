//! Bearer-token authentication extractor.
//!
//! Extracting [`CurrentUser`] from a request validates the bearer token in
//! the `Authorization` header against the session store. Missing, unknown
//! and expired tokens are indistinguishable to the caller.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use vigora_types::auth::AuthenticatedUser;
use vigora_types::error::AuthError;

use crate::http::error::AppError;
use crate::state::AppState;

/// The authenticated caller. Extracting this validates the session token.
pub struct CurrentUser(pub AuthenticatedUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = bearer_value(parts)?;
        let user = state.auth.validate(bearer).await?;
        Ok(CurrentUser(user))
    }
}

/// The raw `Authorization` header value, for endpoints that consume the
/// token itself (refresh, logout).
pub fn bearer_value(parts: &Parts) -> Result<&str, AppError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Auth(AuthError::Unauthenticated))
}
