//! Profile read/update and account deletion.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use vigora_types::error::ProfileError;
use vigora_types::user::{ProfileUpdate, UserProfile};

use crate::repository::user::UserRepository;

/// Orchestrates profile reads and writes for the authenticated user.
pub struct ProfileService<U: UserRepository> {
    users: U,
}

impl<U: UserRepository> ProfileService<U> {
    pub fn new(users: U) -> Self {
        Self { users }
    }

    pub async fn get(&self, user_id: &Uuid) -> Result<UserProfile, ProfileError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ProfileError::NotFound)?;
        Ok(user.profile())
    }

    /// Apply a partial update. Absent fields stay untouched.
    pub async fn update(
        &self,
        user_id: &Uuid,
        update: ProfileUpdate,
    ) -> Result<UserProfile, ProfileError> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ProfileError::NotFound)?;

        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ProfileError::Validation("name cannot be empty".to_string()));
            }
            user.name = name;
        }
        if let Some(email) = update.email {
            let email = email.trim().to_lowercase();
            if email.is_empty() || !email.contains('@') {
                return Err(ProfileError::Validation(
                    "invalid email address".to_string(),
                ));
            }
            user.email = email;
        }
        if let Some(goal) = update.activity_goal {
            if goal < 0 {
                return Err(ProfileError::Validation(
                    "activity goal cannot be negative".to_string(),
                ));
            }
            user.activity_goal = Some(goal);
        }

        user.updated_at = Utc::now();
        self.users.update(&user).await?;
        Ok(user.profile())
    }

    /// Delete the account. Sessions, chats and activities cascade at the
    /// storage layer.
    pub async fn delete_account(&self, user_id: &Uuid) -> Result<(), ProfileError> {
        self.users.delete(user_id).await?;
        info!(user_id = %user_id, "account deleted");
        Ok(())
    }
}
