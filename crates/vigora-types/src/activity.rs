//! Workout activity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Perceived intensity of an activity.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (intensity IN ('low', 'medium', 'high'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityIntensity {
    Low,
    Medium,
    High,
}

impl fmt::Display for ActivityIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityIntensity::Low => write!(f, "low"),
            ActivityIntensity::Medium => write!(f, "medium"),
            ActivityIntensity::High => write!(f, "high"),
        }
    }
}

impl FromStr for ActivityIntensity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(ActivityIntensity::Low),
            "medium" => Ok(ActivityIntensity::Medium),
            "high" => Ok(ActivityIntensity::High),
            other => Err(format!("invalid activity intensity: '{other}'")),
        }
    }
}

/// A logged workout activity, owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub intensity: ActivityIntensity,
    /// Free-text duration as the user entered it (e.g. "30 minutos").
    pub duration: String,
    pub emoji: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate stats for the home screen.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityStats {
    pub total_activities: u64,
    /// Activities logged in the trailing 7 days.
    pub activities_last_week: u64,
    /// The 3 most recently logged activities.
    pub recent_activities: Vec<Activity>,
}
