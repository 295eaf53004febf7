//! Project repository

use crate::db::query::{decode_string_list, encode_string_list, fetch_page, Filter, Filters, SortField, SortSpec};
use crate::db::DynDatabasePool;
use crate::models::{ListParams, PagedResult, ProgressStatus, Project, ProjectFilter, ProjectPost};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

pub const PROJECT_SORT_FIELDS: &[SortSpec] = &[
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
    ("title", "title"),
    ("category", "category"),
    ("status", "status"),
    ("featured", "featured"),
];

const SEARCH_COLUMNS: &[&str] = &["title", "description", "content"];

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, project: &Project) -> Result<Project>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Project>>;

    async fn update(&self, project: &Project) -> Result<Project>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn list(&self, filter: &ProjectFilter, sort: &[SortField], params: &ListParams) -> Result<PagedResult<Project>>;

    async fn add_post(&self, post: &ProjectPost) -> Result<ProjectPost>;

    /// Returns false when no such post exists under the project
    async fn delete_post(&self, project_id: i64, post_id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxProjectRepository {
    pool: DynDatabasePool,
}

impl SqlxProjectRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProjectRepository> {
        Arc::new(Self::new(pool))
    }

    async fn posts_for(&self, project_id: i64) -> Result<Vec<ProjectPost>> {
        let rows = sqlx::query(
            "SELECT id, project_id, title, content, created_at FROM project_posts \
             WHERE project_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(project_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to load project posts")?;

        Ok(rows
            .iter()
            .map(|row| ProjectPost {
                id: row.get("id"),
                project_id: row.get("project_id"),
                title: row.get("title"),
                content: row.get("content"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}

#[async_trait]
impl ProjectRepository for SqlxProjectRepository {
    async fn create(&self, project: &Project) -> Result<Project> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO projects (title, description, content, image, technologies, github_url,
                                  live_url, category, status, featured, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.content)
        .bind(&project.image)
        .bind(encode_string_list(&project.technologies)?)
        .bind(&project.github_url)
        .bind(&project.live_url)
        .bind(&project.category)
        .bind(project.status.as_str())
        .bind(project.featured)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create project")?;

        Ok(Project {
            id: result.last_insert_rowid(),
            posts: Vec::new(),
            created_at: now,
            updated_at: now,
            ..project.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Project>> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get project by ID")?;

        match row {
            Some(row) => {
                let mut project = row_to_project(&row)?;
                project.posts = self.posts_for(id).await?;
                Ok(Some(project))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, project: &Project) -> Result<Project> {
        sqlx::query(
            r#"
            UPDATE projects
            SET title = ?, description = ?, content = ?, image = ?, technologies = ?, github_url = ?,
                live_url = ?, category = ?, status = ?, featured = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.content)
        .bind(&project.image)
        .bind(encode_string_list(&project.technologies)?)
        .bind(&project.github_url)
        .bind(&project.live_url)
        .bind(&project.category)
        .bind(project.status.as_str())
        .bind(project.featured)
        .bind(Utc::now())
        .bind(project.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update project")?;

        self.get_by_id(project.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Project not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete project")?;
        Ok(())
    }

    async fn list(&self, filter: &ProjectFilter, sort: &[SortField], params: &ListParams) -> Result<PagedResult<Project>> {
        let mut filters = Filters::new();
        filters
            .search(SEARCH_COLUMNS, filter.search.as_deref())
            .text("category", filter.category.as_deref())
            .flag("featured", filter.featured)
            .contains("technologies", filter.technology.as_deref());
        if let Some(status) = filter.status {
            filters.push(Filter::text("status", status.as_str()));
        }

        let (rows, total) = fetch_page(self.pool.sqlite(), "projects", filters.as_slice(), sort, params).await?;

        let mut projects = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut project = row_to_project(row)?;
            project.posts = self.posts_for(project.id).await?;
            projects.push(project);
        }

        Ok(PagedResult::new(projects, total, params))
    }

    async fn add_post(&self, post: &ProjectPost) -> Result<ProjectPost> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO project_posts (project_id, title, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(post.project_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to add project post")?;

        Ok(ProjectPost {
            id: result.last_insert_rowid(),
            created_at: now,
            ..post.clone()
        })
    }

    async fn delete_post(&self, project_id: i64, post_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM project_posts WHERE id = ? AND project_id = ?")
            .bind(post_id)
            .bind(project_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete project post")?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM projects")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count projects")?;
        Ok(row.get("count"))
    }
}

fn row_to_project(row: &SqliteRow) -> Result<Project> {
    let status: String = row.get("status");
    let status = ProgressStatus::parse(&status)
        .with_context(|| format!("Invalid project status in database: {}", status))?;
    let technologies: String = row.get("technologies");

    Ok(Project {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        content: row.get("content"),
        image: row.get("image"),
        technologies: decode_string_list(&technologies),
        github_url: row.get("github_url"),
        live_url: row.get("live_url"),
        category: row.get("category"),
        status,
        featured: row.get("featured"),
        posts: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
