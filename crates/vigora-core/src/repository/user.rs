//! UserRepository trait definition.

use uuid::Uuid;
use vigora_types::error::RepositoryError;
use vigora_types::user::User;

/// Repository trait for user account persistence.
///
/// Implementations live in vigora-infra (e.g., `SqliteUserRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait UserRepository: Send + Sync {
    /// Create a new user. Fails with `Conflict` when the email is taken.
    fn create(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;

    /// Find a user by id.
    fn find_by_id(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Find a user by email.
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Update an existing user (name, email, activity goal, updated_at).
    /// Fails with `Conflict` when the new email is taken by another account.
    fn update(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a user. Sessions, chats (and their messages) and activities
    /// cascade at the storage layer.
    fn delete(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
