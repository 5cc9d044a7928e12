//! ActivityRepository trait definition.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use vigora_types::activity::Activity;
use vigora_types::error::RepositoryError;

/// Repository trait for workout activity persistence.
///
/// Implementations live in vigora-infra (e.g., `SqliteActivityRepository`).
pub trait ActivityRepository: Send + Sync {
    /// Create a new activity.
    fn create(
        &self,
        activity: &Activity,
    ) -> impl std::future::Future<Output = Result<Activity, RepositoryError>> + Send;

    /// Get an activity by its unique id.
    fn get(
        &self,
        activity_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Activity>, RepositoryError>> + Send;

    /// List a user's activities ordered by created_at DESC.
    fn list_for_user(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Activity>, RepositoryError>> + Send;

    /// Update an existing activity. Fails with `NotFound` when absent.
    fn update(
        &self,
        activity: &Activity,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete an activity.
    fn delete(
        &self,
        activity_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Total number of activities the user has logged.
    fn count_for_user(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Number of activities logged at or after `since`.
    fn count_since(
        &self,
        user_id: &Uuid,
        since: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// The user's `limit` most recently logged activities.
    fn recent(
        &self,
        user_id: &Uuid,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Activity>, RepositoryError>> + Send;
}
