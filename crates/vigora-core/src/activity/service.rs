//! Activity CRUD and aggregate stats.
//!
//! Same ownership discipline as chats: existence and ownership are separate
//! failures at this layer, collapsed only at the HTTP surface.

use chrono::{Duration, Utc};
use uuid::Uuid;

use vigora_types::activity::{Activity, ActivityIntensity, ActivityStats};
use vigora_types::error::ActivityError;

use crate::repository::activity::ActivityRepository;

/// Days covered by the "last week" stat.
const STATS_WINDOW_DAYS: i64 = 7;

/// How many recent activities the stats endpoint returns.
const RECENT_ACTIVITIES: i64 = 3;

/// Fields for creating or replacing an activity.
#[derive(Debug, Clone)]
pub struct ActivityInput {
    pub name: String,
    pub intensity: ActivityIntensity,
    pub duration: String,
    pub emoji: Option<String>,
}

/// Orchestrates the activity log.
pub struct ActivityService<A: ActivityRepository> {
    activities: A,
}

impl<A: ActivityRepository> ActivityService<A> {
    pub fn new(activities: A) -> Self {
        Self { activities }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        input: ActivityInput,
    ) -> Result<Activity, ActivityError> {
        let input = validate(input)?;

        let now = Utc::now();
        let activity = Activity {
            id: Uuid::now_v7(),
            user_id,
            name: input.name,
            intensity: input.intensity,
            duration: input.duration,
            emoji: input.emoji,
            created_at: now,
            updated_at: now,
        };

        Ok(self.activities.create(&activity).await?)
    }

    pub async fn get(
        &self,
        activity_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Activity, ActivityError> {
        let activity = self
            .activities
            .get(activity_id)
            .await?
            .ok_or(ActivityError::NotFound)?;
        if activity.user_id != *user_id {
            return Err(ActivityError::Forbidden);
        }
        Ok(activity)
    }

    /// A user's activities, most recent first.
    pub async fn list(&self, user_id: &Uuid) -> Result<Vec<Activity>, ActivityError> {
        Ok(self.activities.list_for_user(user_id).await?)
    }

    pub async fn update(
        &self,
        activity_id: &Uuid,
        user_id: &Uuid,
        input: ActivityInput,
    ) -> Result<Activity, ActivityError> {
        let mut activity = self.get(activity_id, user_id).await?;
        let input = validate(input)?;

        activity.name = input.name;
        activity.intensity = input.intensity;
        activity.duration = input.duration;
        activity.emoji = input.emoji;
        activity.updated_at = Utc::now();

        self.activities.update(&activity).await?;
        Ok(activity)
    }

    pub async fn delete(&self, activity_id: &Uuid, user_id: &Uuid) -> Result<(), ActivityError> {
        self.get(activity_id, user_id).await?;
        self.activities.delete(activity_id).await?;
        Ok(())
    }

    /// Aggregate stats for the home screen: all-time total, trailing-week
    /// count, and the 3 most recent entries.
    pub async fn stats(&self, user_id: &Uuid) -> Result<ActivityStats, ActivityError> {
        let total_activities = self.activities.count_for_user(user_id).await?;
        let week_ago = Utc::now() - Duration::days(STATS_WINDOW_DAYS);
        let activities_last_week = self.activities.count_since(user_id, week_ago).await?;
        let recent_activities = self.activities.recent(user_id, RECENT_ACTIVITIES).await?;

        Ok(ActivityStats {
            total_activities,
            activities_last_week,
            recent_activities,
        })
    }
}

fn validate(mut input: ActivityInput) -> Result<ActivityInput, ActivityError> {
    input.name = input.name.trim().to_string();
    if input.name.is_empty() {
        return Err(ActivityError::Validation(
            "name cannot be empty".to_string(),
        ));
    }
    input.duration = input.duration.trim().to_string();
    if input.duration.is_empty() {
        return Err(ActivityError::Validation(
            "duration cannot be empty".to_string(),
        ));
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryActivityRepository;

    fn service() -> ActivityService<InMemoryActivityRepository> {
        ActivityService::new(InMemoryActivityRepository::default())
    }

    fn run_input() -> ActivityInput {
        ActivityInput {
            name: "Corrida no parque".to_string(),
            intensity: ActivityIntensity::Medium,
            duration: "30 minutos".to_string(),
            emoji: Some("🏃".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_most_recent_first() {
        let activities = service();
        let user = Uuid::now_v7();

        let first = activities.create(user, run_input()).await.unwrap();
        let second = activities
            .create(
                user,
                ActivityInput {
                    name: "Musculação".to_string(),
                    intensity: ActivityIntensity::High,
                    duration: "45 minutos".to_string(),
                    emoji: None,
                },
            )
            .await
            .unwrap();

        let list = activities.list(&user).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.id);
        assert_eq!(list[1].id, first.id);
    }

    #[tokio::test]
    async fn test_validation_rejects_blank_fields() {
        let activities = service();
        let user = Uuid::now_v7();

        let mut input = run_input();
        input.name = "  ".to_string();
        assert!(matches!(
            activities.create(user, input).await.unwrap_err(),
            ActivityError::Validation(_)
        ));

        let mut input = run_input();
        input.duration = String::new();
        assert!(matches!(
            activities.create(user, input).await.unwrap_err(),
            ActivityError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_cross_user_access_is_forbidden() {
        let activities = service();
        let owner = Uuid::now_v7();
        let stranger = Uuid::now_v7();
        let activity = activities.create(owner, run_input()).await.unwrap();

        assert!(matches!(
            activities.get(&activity.id, &stranger).await.unwrap_err(),
            ActivityError::Forbidden
        ));
        assert!(matches!(
            activities
                .update(&activity.id, &stranger, run_input())
                .await
                .unwrap_err(),
            ActivityError::Forbidden
        ));
        assert!(matches!(
            activities
                .delete(&activity.id, &stranger)
                .await
                .unwrap_err(),
            ActivityError::Forbidden
        ));

        assert!(activities.get(&activity.id, &owner).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let activities = service();
        let user = Uuid::now_v7();
        let activity = activities.create(user, run_input()).await.unwrap();

        let updated = activities
            .update(
                &activity.id,
                &user,
                ActivityInput {
                    name: "Caminhada".to_string(),
                    intensity: ActivityIntensity::Low,
                    duration: "1 hora".to_string(),
                    emoji: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Caminhada");
        assert_eq!(updated.intensity, ActivityIntensity::Low);
        assert!(updated.emoji.is_none());
        assert!(updated.updated_at >= activity.updated_at);
    }

    #[tokio::test]
    async fn test_stats_counts_and_recent() {
        let activities = service();
        let user = Uuid::now_v7();

        for i in 0..5 {
            activities
                .create(
                    user,
                    ActivityInput {
                        name: format!("atividade {i}"),
                        intensity: ActivityIntensity::Medium,
                        duration: "20 minutos".to_string(),
                        emoji: None,
                    },
                )
                .await
                .unwrap();
        }

        let stats = activities.stats(&user).await.unwrap();
        assert_eq!(stats.total_activities, 5);
        // All were created just now, so all fall inside the 7-day window
        assert_eq!(stats.activities_last_week, 5);
        assert_eq!(stats.recent_activities.len(), 3);
        assert_eq!(stats.recent_activities[0].name, "atividade 4");
    }
}
