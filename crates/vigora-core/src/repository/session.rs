//! SessionRepository trait definition.

use vigora_types::auth::AuthSession;
use vigora_types::error::RepositoryError;

/// Repository trait for auth session persistence.
///
/// Implementations live in vigora-infra (e.g., `SqliteSessionRepository`).
pub trait SessionRepository: Send + Sync {
    /// Persist a newly issued session.
    fn create(
        &self,
        session: &AuthSession,
    ) -> impl std::future::Future<Output = Result<AuthSession, RepositoryError>> + Send;

    /// Look up a session by its opaque token.
    fn find_by_token(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Option<AuthSession>, RepositoryError>> + Send;

    /// Delete the session holding `token`. Fails with `NotFound` when absent.
    fn delete_by_token(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Atomically replace the session holding `old_token` with `replacement`.
    ///
    /// Both the insert of the new row and the delete of the old one happen in
    /// a single transaction, so at no observable point are both tokens valid.
    /// Fails with `NotFound` when `old_token` does not exist.
    fn rotate(
        &self,
        old_token: &str,
        replacement: &AuthSession,
    ) -> impl std::future::Future<Output = Result<AuthSession, RepositoryError>> + Send;
}
