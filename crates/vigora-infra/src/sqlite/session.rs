//! SQLite session repository implementation.
//!
//! Token rotation runs inside a single transaction so the old and new tokens
//! are never both valid at an observable point.

use sqlx::Row;
use uuid::Uuid;

use vigora_core::repository::session::SessionRepository;
use vigora_types::auth::AuthSession;
use vigora_types::error::RepositoryError;

use super::pool::DatabasePool;
use super::user::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `SessionRepository`.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain AuthSession.
struct SessionRow {
    id: String,
    user_id: String,
    token: String,
    expires_at: String,
    created_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            token: row.try_get("token")?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_session(self) -> Result<AuthSession, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid session id: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| RepositoryError::Query(format!("invalid user_id: {e}")))?;
        Ok(AuthSession {
            id,
            user_id,
            token: self.token,
            expires_at: parse_datetime(&self.expires_at)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: &AuthSession) -> Result<AuthSession, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO auth_sessions (id, user_id, token, expires_at, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(session.id.to_string())
        .bind(session.user_id.to_string())
        .bind(&session.token)
        .bind(format_datetime(&session.expires_at))
        .bind(format_datetime(&session.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(session.clone())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<AuthSession>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM auth_sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let session_row = SessionRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(session_row.into_session()?))
            }
            None => Ok(None),
        }
    }

    async fn delete_by_token(&self, token: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn rotate(
        &self,
        old_token: &str,
        replacement: &AuthSession,
    ) -> Result<AuthSession, RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let deleted = sqlx::query("DELETE FROM auth_sessions WHERE token = ?")
            .bind(old_token)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if deleted.rows_affected() == 0 {
            // Nothing to rotate; the transaction rolls back on drop.
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            r#"INSERT INTO auth_sessions (id, user_id, token, expires_at, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(replacement.id.to_string())
        .bind(replacement.user_id.to_string())
        .bind(&replacement.token)
        .bind(format_datetime(&replacement.expires_at))
        .bind(format_datetime(&replacement.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(replacement.clone())
    }
}
