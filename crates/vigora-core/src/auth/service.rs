//! Session validation and issuance.
//!
//! The validator is the leaf dependency of every protected operation: given
//! a bearer token it resolves the authenticated user, enforcing expiry. All
//! failure sub-cases (missing token, unknown token, expired token) collapse
//! to the single `AuthError::Unauthenticated` so callers cannot probe which
//! one applied.
//!
//! Issuance (register/login) and rotation (refresh) also live here: they
//! produce the opaque tokens the validator consumes.

use chrono::{Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::info;
use uuid::Uuid;

use vigora_types::auth::{AuthSession, AuthenticatedUser, SESSION_TTL_DAYS};
use vigora_types::error::AuthError;
use vigora_types::user::User;

use crate::auth::password::PasswordHasher;
use crate::repository::session::SessionRepository;
use crate::repository::user::UserRepository;

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;

/// Issued credentials returned by register/login/refresh.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: User,
    pub session: AuthSession,
}

/// Session validator and issuer.
///
/// Generic over the session/user repositories and the password hasher to
/// maintain clean architecture (vigora-core never depends on vigora-infra).
pub struct AuthService<S: SessionRepository, U: UserRepository, H: PasswordHasher> {
    sessions: S,
    users: U,
    hasher: H,
}

impl<S: SessionRepository, U: UserRepository, H: PasswordHasher> AuthService<S, U, H> {
    pub fn new(sessions: S, users: U, hasher: H) -> Self {
        Self {
            sessions,
            users,
            hasher,
        }
    }

    // --- Validation ---

    /// Resolve a bearer token to its authenticated user.
    ///
    /// Strips an optional `"Bearer "` prefix, looks the token up, and
    /// succeeds only when the session exists and its expiry is strictly in
    /// the future. Pure read: expired rows are not deleted here.
    pub async fn validate(&self, bearer: &str) -> Result<AuthenticatedUser, AuthError> {
        let token = strip_bearer(bearer);
        if token.is_empty() {
            return Err(AuthError::Unauthenticated);
        }

        let session = self
            .sessions
            .find_by_token(token)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if !session.is_valid_at(Utc::now()) {
            return Err(AuthError::Unauthenticated);
        }

        let user = self
            .users
            .find_by_id(&session.user_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        Ok(AuthenticatedUser {
            user_id: user.id,
            email: user.email,
            name: user.name,
            session,
        })
    }

    // --- Issuance ---

    /// Register a new account and issue its first session.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<IssuedSession, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::Validation("name cannot be empty".to_string()));
        }
        let email = normalize_email(email)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = self.hasher.hash(password)?;
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            email: email.clone(),
            name: name.to_string(),
            password_hash,
            activity_goal: None,
            created_at: now,
            updated_at: now,
        };

        let user = self.users.create(&user).await?;
        info!(user_id = %user.id, "account registered");

        let session = self.sessions.create(&new_session(user.id)).await?;
        Ok(IssuedSession { user, session })
    }

    /// Log in with email and password, issuing a fresh session.
    ///
    /// Failure is uniform whether the email is unknown or the password is
    /// wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession, AuthError> {
        let email = normalize_email(email)?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if !self.hasher.verify(password, &user.password_hash)? {
            return Err(AuthError::Unauthenticated);
        }

        let session = self.sessions.create(&new_session(user.id)).await?;
        info!(user_id = %user.id, "login");
        Ok(IssuedSession { user, session })
    }

    /// Rotate a valid session token: issue a new token and delete the old
    /// row in one transaction. An invalid or expired token fails with
    /// `Unauthenticated` and nothing changes.
    pub async fn refresh(&self, bearer: &str) -> Result<IssuedSession, AuthError> {
        let current = self.validate(bearer).await?;

        let replacement = new_session(current.user_id);
        let session = self
            .sessions
            .rotate(&current.session.token, &replacement)
            .await?;

        let user = self
            .users
            .find_by_id(&current.user_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        info!(user_id = %user.id, "session rotated");
        Ok(IssuedSession { user, session })
    }

    /// Invalidate the session holding the presented token.
    pub async fn logout(&self, bearer: &str) -> Result<(), AuthError> {
        let token = strip_bearer(bearer);
        self.sessions.delete_by_token(token).await?;
        Ok(())
    }
}

/// Strip an optional `"Bearer "` prefix from an Authorization value.
fn strip_bearer(value: &str) -> &str {
    value.strip_prefix("Bearer ").unwrap_or(value).trim()
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::Validation("invalid email address".to_string()));
    }
    Ok(email)
}

/// Build a fresh session row for `user_id` with a new opaque token.
fn new_session(user_id: Uuid) -> AuthSession {
    let now = Utc::now();
    AuthSession {
        id: Uuid::now_v7(),
        user_id,
        token: generate_token(),
        expires_at: now + Duration::days(SESSION_TTL_DAYS),
        created_at: now,
    }
}

/// 32 bytes of OS entropy, hex encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
