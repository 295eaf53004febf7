//! Build-in-public service
//!
//! Entries with milestones derive `progress` from them; every milestone
//! write ends with a recompute so the stored value never drifts. Entries
//! without milestones keep whatever progress an admin set, clamped to
//! 0..=100.

use crate::db::repositories::{BuildInPublicRepository, BUILD_IN_PUBLIC_SORT_FIELDS};
use crate::models::{
    milestone_progress, BuildInPublic, BuildInPublicFilter, CreateBuildInPublicInput, CreateMilestoneInput,
    ListParams, Milestone, PagedResult, UpdateBuildInPublicInput, UpdateMilestoneInput,
};
use crate::services::content::{
    clean_list, optional_text, parse_sort, patch_optional, patch_required, require_text, write_error,
    ContentServiceError,
};
use chrono::Utc;
use std::sync::Arc;

fn clamp_progress(value: i64) -> i64 {
    value.clamp(0, 100)
}

pub struct BuildInPublicService {
    repo: Arc<dyn BuildInPublicRepository>,
}

impl BuildInPublicService {
    pub fn new(repo: Arc<dyn BuildInPublicRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(
        &self,
        filter: &BuildInPublicFilter,
        sort: Option<&str>,
        params: &ListParams,
    ) -> Result<PagedResult<BuildInPublic>, ContentServiceError> {
        let sort = parse_sort(sort, BUILD_IN_PUBLIC_SORT_FIELDS)?;
        Ok(self.repo.list(filter, &sort, params).await?)
    }

    pub async fn get(&self, id: i64) -> Result<BuildInPublic, ContentServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ContentServiceError::not_found("Build in public entry", id))
    }

    pub async fn create(&self, input: CreateBuildInPublicInput) -> Result<BuildInPublic, ContentServiceError> {
        let now = Utc::now();
        let entry = BuildInPublic {
            id: 0,
            title: require_text(&input.title, "Please add a title")?,
            description: require_text(&input.description, "Please add a description")?,
            content: optional_text(input.content),
            image: optional_text(input.image),
            tags: clean_list(input.tags),
            status: input.status.unwrap_or_default(),
            progress: clamp_progress(input.progress.unwrap_or(0)),
            milestones: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&entry).await.map_err(write_error)?;
        tracing::info!(entry_id = created.id, "build-in-public entry created");
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: UpdateBuildInPublicInput) -> Result<BuildInPublic, ContentServiceError> {
        let mut entry = self.get(id).await?;

        patch_required(&mut entry.title, input.title, "Please add a title")?;
        patch_required(&mut entry.description, input.description, "Please add a description")?;
        patch_optional(&mut entry.content, input.content);
        patch_optional(&mut entry.image, input.image);
        if let Some(tags) = input.tags {
            entry.tags = clean_list(tags);
        }
        if let Some(status) = input.status {
            entry.status = status;
        }
        entry.progress = match milestone_progress(&entry.milestones) {
            Some(derived) => derived,
            None => clamp_progress(input.progress.unwrap_or(entry.progress)),
        };

        self.repo.update(&entry).await.map_err(write_error)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentServiceError> {
        self.get(id).await?;
        self.repo.delete(id).await?;
        tracing::info!(entry_id = id, "build-in-public entry deleted");
        Ok(())
    }

    pub async fn add_milestone(&self, id: i64, input: CreateMilestoneInput) -> Result<BuildInPublic, ContentServiceError> {
        let entry = self.get(id).await?;
        let now = Utc::now();

        self.repo
            .add_milestone(&Milestone {
                id: 0,
                entry_id: entry.id,
                title: require_text(&input.title, "Please add a milestone title")?,
                description: optional_text(input.description),
                completed: input.completed,
                completed_at: input.completed.then_some(now),
                due_date: input.due_date,
                created_at: now,
            })
            .await?;

        self.recompute(entry.id).await
    }

    pub async fn update_milestone(
        &self,
        id: i64,
        milestone_id: i64,
        input: UpdateMilestoneInput,
    ) -> Result<BuildInPublic, ContentServiceError> {
        let entry = self.get(id).await?;
        let mut milestone = self
            .repo
            .get_milestone(entry.id, milestone_id)
            .await?
            .ok_or_else(|| ContentServiceError::not_found("Milestone", milestone_id))?;

        patch_required(&mut milestone.title, input.title, "Please add a milestone title")?;
        patch_optional(&mut milestone.description, input.description);
        if let Some(due_date) = input.due_date {
            milestone.due_date = due_date;
        }
        if let Some(completed) = input.completed {
            // keep the original completion time when nothing changed
            if completed && !milestone.completed {
                milestone.completed_at = Some(Utc::now());
            } else if !completed {
                milestone.completed_at = None;
            }
            milestone.completed = completed;
        }

        self.repo.update_milestone(&milestone).await?;
        self.recompute(entry.id).await
    }

    pub async fn delete_milestone(&self, id: i64, milestone_id: i64) -> Result<BuildInPublic, ContentServiceError> {
        let entry = self.get(id).await?;
        if !self.repo.delete_milestone(entry.id, milestone_id).await? {
            return Err(ContentServiceError::not_found("Milestone", milestone_id));
        }
        self.recompute(entry.id).await
    }

    /// Reload the entry and store the progress its milestones imply
    async fn recompute(&self, id: i64) -> Result<BuildInPublic, ContentServiceError> {
        let mut entry = self.get(id).await?;
        if let Some(progress) = milestone_progress(&entry.milestones) {
            if progress != entry.progress {
                self.repo.set_progress(entry.id, progress).await?;
                tracing::debug!(entry_id = entry.id, progress, "progress recomputed");
                entry.progress = progress;
            }
        }
        Ok(entry)
    }

    pub async fn count(&self) -> Result<i64, ContentServiceError> {
        Ok(self.repo.count().await?)
    }
}
