//! Project service

use crate::db::repositories::{ProjectRepository, PROJECT_SORT_FIELDS};
use crate::models::{
    CreateProjectInput, CreateProjectPostInput, ListParams, PagedResult, Project, ProjectFilter, ProjectPost,
    UpdateProjectInput,
};
use crate::services::content::{
    clean_list, optional_text, parse_sort, patch_optional, patch_required, require_text, write_error,
    ContentServiceError,
};
use chrono::Utc;
use std::sync::Arc;

pub struct ProjectService {
    repo: Arc<dyn ProjectRepository>,
}

impl ProjectService {
    pub fn new(repo: Arc<dyn ProjectRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(
        &self,
        filter: &ProjectFilter,
        sort: Option<&str>,
        params: &ListParams,
    ) -> Result<PagedResult<Project>, ContentServiceError> {
        let sort = parse_sort(sort, PROJECT_SORT_FIELDS)?;
        Ok(self.repo.list(filter, &sort, params).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Project, ContentServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ContentServiceError::not_found("Project", id))
    }

    pub async fn create(&self, input: CreateProjectInput) -> Result<Project, ContentServiceError> {
        let now = Utc::now();
        let project = Project {
            id: 0,
            title: require_text(&input.title, "Please add a title")?,
            description: require_text(&input.description, "Please add a description")?,
            content: optional_text(input.content),
            image: optional_text(input.image),
            technologies: clean_list(input.technologies),
            github_url: optional_text(input.github_url),
            live_url: optional_text(input.live_url),
            category: optional_text(input.category),
            status: input.status.unwrap_or_default(),
            featured: input.featured.unwrap_or(false),
            posts: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&project).await.map_err(write_error)?;
        tracing::info!(project_id = created.id, "project created");
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: UpdateProjectInput) -> Result<Project, ContentServiceError> {
        let mut project = self.get(id).await?;

        patch_required(&mut project.title, input.title, "Please add a title")?;
        patch_required(&mut project.description, input.description, "Please add a description")?;
        patch_optional(&mut project.content, input.content);
        patch_optional(&mut project.image, input.image);
        patch_optional(&mut project.github_url, input.github_url);
        patch_optional(&mut project.live_url, input.live_url);
        patch_optional(&mut project.category, input.category);
        if let Some(technologies) = input.technologies {
            project.technologies = clean_list(technologies);
        }
        if let Some(status) = input.status {
            project.status = status;
        }
        if let Some(featured) = input.featured {
            project.featured = featured;
        }

        self.repo.update(&project).await.map_err(write_error)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentServiceError> {
        self.get(id).await?;
        self.repo.delete(id).await?;
        tracing::info!(project_id = id, "project deleted");
        Ok(())
    }

    /// Append a progress post and return the project with all posts
    pub async fn add_post(&self, id: i64, input: CreateProjectPostInput) -> Result<Project, ContentServiceError> {
        let project = self.get(id).await?;
        self.repo
            .add_post(&ProjectPost {
                id: 0,
                project_id: project.id,
                title: require_text(&input.title, "Please add a title")?,
                content: require_text(&input.content, "Please add some content")?,
                created_at: Utc::now(),
            })
            .await?;
        self.get(project.id).await
    }

    pub async fn delete_post(&self, id: i64, post_id: i64) -> Result<Project, ContentServiceError> {
        let project = self.get(id).await?;
        if !self.repo.delete_post(project.id, post_id).await? {
            return Err(ContentServiceError::not_found("Post", post_id));
        }
        self.get(project.id).await
    }

    pub async fn count(&self) -> Result<i64, ContentServiceError> {
        Ok(self.repo.count().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxProjectRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::ProgressStatus;

    async fn setup_test_service() -> ProjectService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        ProjectService::new(SqlxProjectRepository::boxed(pool))
    }

    fn input(title: &str) -> CreateProjectInput {
        CreateProjectInput {
            title: title.to_string(),
            description: "A thing I built".to_string(),
            technologies: vec!["Rust".into(), "SQLite".into(), "Rust".into()],
            github_url: Some("  ".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = setup_test_service().await;
        let created = service.create(input("Portfolio")).await.unwrap();

        let fetched = service.get(created.id).await.unwrap();
        assert_eq!(fetched.title, "Portfolio");
        assert_eq!(fetched.technologies, vec!["Rust".to_string(), "SQLite".to_string()]);
        assert_eq!(fetched.status, ProgressStatus::InProgress);
        assert!(fetched.github_url.is_none());
        assert!(!fetched.featured);
    }

    #[tokio::test]
    async fn test_create_requires_description() {
        let service = setup_test_service().await;
        let mut bad = input("Nope");
        bad.description = String::new();
        assert!(matches!(
            service.create(bad).await,
            Err(ContentServiceError::Validation(m)) if m == "Please add a description"
        ));
    }

    #[tokio::test]
    async fn test_update_partial() {
        let service = setup_test_service().await;
        let created = service.create(input("Old")).await.unwrap();

        let updated = service
            .update(
                created.id,
                UpdateProjectInput {
                    status: Some(ProgressStatus::Completed),
                    featured: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Old");
        assert_eq!(updated.status, ProgressStatus::Completed);
        assert!(updated.featured);

        let blank_title = service
            .update(created.id, UpdateProjectInput { title: Some(" ".into()), ..Default::default() })
            .await;
        assert!(matches!(blank_title, Err(ContentServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_posts() {
        let service = setup_test_service().await;
        let project = service.create(input("Logged")).await.unwrap();

        let with_post = service
            .add_post(project.id, CreateProjectPostInput { title: "Week 1".into(), content: "Started".into() })
            .await
            .unwrap();
        assert_eq!(with_post.posts.len(), 1);
        let post_id = with_post.posts[0].id;

        let without = service.delete_post(project.id, post_id).await.unwrap();
        assert!(without.posts.is_empty());

        assert!(matches!(
            service.delete_post(project.id, post_id).await,
            Err(ContentServiceError::NotFound(m)) if m == format!("Post not found with id of {}", post_id)
        ));
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let service = setup_test_service().await;
        assert!(matches!(service.delete(42).await, Err(ContentServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_sort_rejected() {
        let service = setup_test_service().await;
        let result = service
            .list(&ProjectFilter::default(), Some("-password"), &ListParams::default())
            .await;
        assert!(matches!(result, Err(ContentServiceError::Validation(_))));
    }
}
