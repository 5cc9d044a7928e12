//! User account types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user account.
///
/// The password hash never leaves the storage layer: `User` is not
/// serialized directly to API responses -- use [`UserProfile`] for that.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    /// Weekly activity goal, if the user has set one.
    pub activity_goal: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The public view of this account.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            activity_goal: self.activity_goal,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Public profile view of a user, safe to serialize to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub activity_goal: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a user may change on their own profile.
///
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub activity_goal: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_omits_password_hash() {
        let user = User {
            id: Uuid::now_v7(),
            email: "ana@example.com".to_string(),
            name: "Ana".to_string(),
            password_hash: "$argon2id$...".to_string(),
            activity_goal: Some(5),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&user.profile()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("ana@example.com"));
        assert!(json.contains("\"activity_goal\":5"));
    }
}
