//! SQLite activity repository implementation.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use vigora_core::repository::activity::ActivityRepository;
use vigora_types::activity::{Activity, ActivityIntensity};
use vigora_types::error::RepositoryError;

use super::pool::DatabasePool;
use super::user::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `ActivityRepository`.
pub struct SqliteActivityRepository {
    pool: DatabasePool,
}

impl SqliteActivityRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Activity.
struct ActivityRow {
    id: String,
    user_id: String,
    name: String,
    intensity: String,
    duration: String,
    emoji: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ActivityRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            intensity: row.try_get("intensity")?,
            duration: row.try_get("duration")?,
            emoji: row.try_get("emoji")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_activity(self) -> Result<Activity, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid activity id: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| RepositoryError::Query(format!("invalid user_id: {e}")))?;
        let intensity: ActivityIntensity = self
            .intensity
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Activity {
            id,
            user_id,
            name: self.name,
            intensity,
            duration: self.duration,
            emoji: self.emoji,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn rows_to_activities(
    rows: &[sqlx::sqlite::SqliteRow],
) -> Result<Vec<Activity>, RepositoryError> {
    let mut activities = Vec::with_capacity(rows.len());
    for row in rows {
        let activity_row = ActivityRow::from_row(row)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        activities.push(activity_row.into_activity()?);
    }
    Ok(activities)
}

impl ActivityRepository for SqliteActivityRepository {
    async fn create(&self, activity: &Activity) -> Result<Activity, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO activities (id, user_id, name, intensity, duration, emoji, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(activity.id.to_string())
        .bind(activity.user_id.to_string())
        .bind(&activity.name)
        .bind(activity.intensity.to_string())
        .bind(&activity.duration)
        .bind(&activity.emoji)
        .bind(format_datetime(&activity.created_at))
        .bind(format_datetime(&activity.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(activity.clone())
    }

    async fn get(&self, activity_id: &Uuid) -> Result<Option<Activity>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM activities WHERE id = ?")
            .bind(activity_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let activity_row = ActivityRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(activity_row.into_activity()?))
            }
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: &Uuid) -> Result<Vec<Activity>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM activities WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_activities(&rows)
    }

    async fn update(&self, activity: &Activity) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE activities
               SET name = ?, intensity = ?, duration = ?, emoji = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&activity.name)
        .bind(activity.intensity.to_string())
        .bind(&activity.duration)
        .bind(&activity.emoji)
        .bind(format_datetime(&activity.updated_at))
        .bind(activity.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete(&self, activity_id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM activities WHERE id = ?")
            .bind(activity_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn count_for_user(&self, user_id: &Uuid) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM activities WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(count as u64)
    }

    async fn count_since(
        &self,
        user_id: &Uuid,
        since: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) as cnt FROM activities WHERE user_id = ? AND created_at >= ?",
        )
        .bind(user_id.to_string())
        .bind(format_datetime(&since))
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(count as u64)
    }

    async fn recent(&self, user_id: &Uuid, limit: i64) -> Result<Vec<Activity>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM activities WHERE user_id = ?
               ORDER BY created_at DESC, id DESC LIMIT ?"#,
        )
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_activities(&rows)
    }
}
