//! Build-in-public model
//!
//! Public progress logs. Each entry carries an ordered list of milestones;
//! once it has any, `progress` is derived from how many are completed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProgressStatus;

/// Build-in-public entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInPublic {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub content: Option<String>,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub status: ProgressStatus,
    /// Percentage complete, 0 to 100
    pub progress: i64,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Percentage of completed milestones, rounded half away from zero.
///
/// Returns `None` for an empty list so a manually set value survives.
pub fn milestone_progress(milestones: &[Milestone]) -> Option<i64> {
    if milestones.is_empty() {
        return None;
    }
    let done = milestones.iter().filter(|m| m.completed).count() as f64;
    Some((100.0 * done / milestones.len() as f64).round() as i64)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: i64,
    pub entry_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBuildInPublicInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: Option<ProgressStatus>,
    pub progress: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBuildInPublicInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<ProgressStatus>,
    /// Ignored while the entry has milestones
    pub progress: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMilestoneInput {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMilestoneInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    /// Absent leaves the date alone, `null` clears it
    #[serde(default, deserialize_with = "super::nullable")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Filters accepted by the build-in-public list
#[derive(Debug, Clone, Default)]
pub struct BuildInPublicFilter {
    pub search: Option<String>,
    pub status: Option<ProgressStatus>,
    pub tag: Option<String>,
}
