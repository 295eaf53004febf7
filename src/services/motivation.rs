//! Motivation service

use crate::db::repositories::{Counter, MotivationRepository, MOTIVATION_SORT_FIELDS};
use crate::models::{
    CreateMotivationInput, ListParams, Motivation, MotivationFilter, PagedResult, UpdateMotivationInput,
};
use crate::services::content::{clean_list, optional_text, parse_sort, patch_optional, write_error, ContentServiceError};
use chrono::Utc;
use std::sync::Arc;

/// Quotes need text, images and videos need a media URL
fn validate(motivation: &Motivation) -> Result<(), ContentServiceError> {
    if motivation.kind.needs_media() {
        if motivation.media_url.is_none() {
            return Err(ContentServiceError::Validation(format!(
                "Please add a media URL for a {} motivation",
                motivation.kind
            )));
        }
    } else if motivation.content.is_empty() {
        return Err(ContentServiceError::Validation("Please add the quote content".to_string()));
    }
    Ok(())
}

pub struct MotivationService {
    repo: Arc<dyn MotivationRepository>,
}

impl MotivationService {
    pub fn new(repo: Arc<dyn MotivationRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(
        &self,
        filter: &MotivationFilter,
        sort: Option<&str>,
        params: &ListParams,
    ) -> Result<PagedResult<Motivation>, ContentServiceError> {
        let sort = parse_sort(sort, MOTIVATION_SORT_FIELDS)?;
        Ok(self.repo.list(filter, &sort, params).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Motivation, ContentServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ContentServiceError::not_found("Motivation", id))
    }

    /// Fetch for display and count the view
    pub async fn view(&self, id: i64) -> Result<Motivation, ContentServiceError> {
        self.bump(id, Counter::Views).await
    }

    pub async fn like(&self, id: i64) -> Result<Motivation, ContentServiceError> {
        self.bump(id, Counter::Likes).await
    }

    pub async fn share(&self, id: i64) -> Result<Motivation, ContentServiceError> {
        self.bump(id, Counter::Shares).await
    }

    async fn bump(&self, id: i64, counter: Counter) -> Result<Motivation, ContentServiceError> {
        if !self.repo.increment(id, counter).await? {
            return Err(ContentServiceError::not_found("Motivation", id));
        }
        self.get(id).await
    }

    pub async fn random(&self) -> Result<Motivation, ContentServiceError> {
        self.repo
            .random()
            .await?
            .ok_or_else(|| ContentServiceError::NotFound("No motivations found".to_string()))
    }

    pub async fn create(&self, input: CreateMotivationInput) -> Result<Motivation, ContentServiceError> {
        let now = Utc::now();
        let motivation = Motivation {
            id: 0,
            kind: input.kind.unwrap_or_default(),
            content: input.content.trim().to_string(),
            author: optional_text(input.author),
            media_url: optional_text(input.media_url),
            tags: clean_list(input.tags),
            likes: 0,
            views: 0,
            shares: 0,
            created_at: now,
            updated_at: now,
        };
        validate(&motivation)?;

        let created = self.repo.create(&motivation).await.map_err(write_error)?;
        tracing::info!(motivation_id = created.id, kind = %created.kind, "motivation created");
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: UpdateMotivationInput) -> Result<Motivation, ContentServiceError> {
        let mut motivation = self.get(id).await?;

        if let Some(kind) = input.kind {
            motivation.kind = kind;
        }
        if let Some(content) = input.content {
            motivation.content = content.trim().to_string();
        }
        patch_optional(&mut motivation.author, input.author);
        patch_optional(&mut motivation.media_url, input.media_url);
        if let Some(tags) = input.tags {
            motivation.tags = clean_list(tags);
        }
        validate(&motivation)?;

        self.repo.update(&motivation).await.map_err(write_error)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentServiceError> {
        self.get(id).await?;
        self.repo.delete(id).await?;
        tracing::info!(motivation_id = id, "motivation deleted");
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, ContentServiceError> {
        Ok(self.repo.count().await?)
    }
}
