//! Authentication session types.
//!
//! A session is the server-recorded proof of authentication: an opaque
//! bearer token bound to a user and an expiry. Tokens are rotated on
//! refresh (new row issued, old row deleted), never renewed in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of an issued session token.
pub const SESSION_TTL_DAYS: i64 = 30;

/// A server-side authentication session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Opaque bearer token (random hex, unique).
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AuthSession {
    /// Whether the session is still valid at `now`.
    ///
    /// Expiry is strict: a session whose `expires_at` equals `now` is
    /// already expired.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// The resolved identity of an authenticated caller.
///
/// Returned by session validation and attached to every protected request.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    /// The session the caller presented, for downstream use
    /// (e.g. logout-by-token, rotation).
    pub session: AuthSession,
}
