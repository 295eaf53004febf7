//! Build-in-public repository

use crate::db::query::{decode_string_list, encode_string_list, fetch_page, Filter, Filters, SortField, SortSpec};
use crate::db::DynDatabasePool;
use crate::models::{BuildInPublic, BuildInPublicFilter, ListParams, Milestone, PagedResult, ProgressStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

pub const BUILD_IN_PUBLIC_SORT_FIELDS: &[SortSpec] = &[
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
    ("title", "title"),
    ("progress", "progress"),
    ("status", "status"),
];

const SEARCH_COLUMNS: &[&str] = &["title", "description", "content"];

const MILESTONE_COLUMNS: &str = "id, entry_id, title, description, completed, completed_at, due_date, created_at";

#[async_trait]
pub trait BuildInPublicRepository: Send + Sync {
    async fn create(&self, entry: &BuildInPublic) -> Result<BuildInPublic>;

    async fn get_by_id(&self, id: i64) -> Result<Option<BuildInPublic>>;

    async fn update(&self, entry: &BuildInPublic) -> Result<BuildInPublic>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn list(
        &self,
        filter: &BuildInPublicFilter,
        sort: &[SortField],
        params: &ListParams,
    ) -> Result<PagedResult<BuildInPublic>>;

    async fn set_progress(&self, id: i64, progress: i64) -> Result<()>;

    async fn add_milestone(&self, milestone: &Milestone) -> Result<Milestone>;

    async fn get_milestone(&self, entry_id: i64, milestone_id: i64) -> Result<Option<Milestone>>;

    async fn update_milestone(&self, milestone: &Milestone) -> Result<Milestone>;

    async fn delete_milestone(&self, entry_id: i64, milestone_id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxBuildInPublicRepository {
    pool: DynDatabasePool,
}

impl SqlxBuildInPublicRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BuildInPublicRepository> {
        Arc::new(Self::new(pool))
    }

    async fn milestones_for(&self, entry_id: i64) -> Result<Vec<Milestone>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM build_in_public_milestones WHERE entry_id = ? ORDER BY created_at ASC, id ASC",
            MILESTONE_COLUMNS
        ))
        .bind(entry_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to load milestones")?;

        Ok(rows.iter().map(row_to_milestone).collect())
    }
}

#[async_trait]
impl BuildInPublicRepository for SqlxBuildInPublicRepository {
    async fn create(&self, entry: &BuildInPublic) -> Result<BuildInPublic> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO build_in_public (title, description, content, image, tags, status, progress,
                                         created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.title)
        .bind(&entry.description)
        .bind(&entry.content)
        .bind(&entry.image)
        .bind(encode_string_list(&entry.tags)?)
        .bind(entry.status.as_str())
        .bind(entry.progress)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create build-in-public entry")?;

        Ok(BuildInPublic {
            id: result.last_insert_rowid(),
            milestones: Vec::new(),
            created_at: now,
            updated_at: now,
            ..entry.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<BuildInPublic>> {
        let row = sqlx::query("SELECT * FROM build_in_public WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get build-in-public entry")?;

        match row {
            Some(row) => {
                let mut entry = row_to_entry(&row)?;
                entry.milestones = self.milestones_for(id).await?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, entry: &BuildInPublic) -> Result<BuildInPublic> {
        sqlx::query(
            r#"
            UPDATE build_in_public
            SET title = ?, description = ?, content = ?, image = ?, tags = ?, status = ?,
                progress = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&entry.title)
        .bind(&entry.description)
        .bind(&entry.content)
        .bind(&entry.image)
        .bind(encode_string_list(&entry.tags)?)
        .bind(entry.status.as_str())
        .bind(entry.progress)
        .bind(Utc::now())
        .bind(entry.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update build-in-public entry")?;

        self.get_by_id(entry.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Build-in-public entry not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM build_in_public WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete build-in-public entry")?;
        Ok(())
    }

    async fn list(
        &self,
        filter: &BuildInPublicFilter,
        sort: &[SortField],
        params: &ListParams,
    ) -> Result<PagedResult<BuildInPublic>> {
        let mut filters = Filters::new();
        filters
            .search(SEARCH_COLUMNS, filter.search.as_deref())
            .contains("tags", filter.tag.as_deref());
        if let Some(status) = filter.status {
            filters.push(Filter::text("status", status.as_str()));
        }

        let (rows, total) =
            fetch_page(self.pool.sqlite(), "build_in_public", filters.as_slice(), sort, params).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut entry = row_to_entry(row)?;
            entry.milestones = self.milestones_for(entry.id).await?;
            entries.push(entry);
        }

        Ok(PagedResult::new(entries, total, params))
    }

    async fn set_progress(&self, id: i64, progress: i64) -> Result<()> {
        sqlx::query("UPDATE build_in_public SET progress = ?, updated_at = ? WHERE id = ?")
            .bind(progress)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to set progress")?;
        Ok(())
    }

    async fn add_milestone(&self, milestone: &Milestone) -> Result<Milestone> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO build_in_public_milestones (entry_id, title, description, completed,
                                                    completed_at, due_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(milestone.entry_id)
        .bind(&milestone.title)
        .bind(&milestone.description)
        .bind(milestone.completed)
        .bind(milestone.completed_at)
        .bind(milestone.due_date)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to add milestone")?;

        Ok(Milestone {
            id: result.last_insert_rowid(),
            created_at: now,
            ..milestone.clone()
        })
    }

    async fn get_milestone(&self, entry_id: i64, milestone_id: i64) -> Result<Option<Milestone>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM build_in_public_milestones WHERE id = ? AND entry_id = ?",
            MILESTONE_COLUMNS
        ))
        .bind(milestone_id)
        .bind(entry_id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get milestone")?;

        Ok(row.as_ref().map(row_to_milestone))
    }

    async fn update_milestone(&self, milestone: &Milestone) -> Result<Milestone> {
        sqlx::query(
            r#"
            UPDATE build_in_public_milestones
            SET title = ?, description = ?, completed = ?, completed_at = ?, due_date = ?
            WHERE id = ? AND entry_id = ?
            "#,
        )
        .bind(&milestone.title)
        .bind(&milestone.description)
        .bind(milestone.completed)
        .bind(milestone.completed_at)
        .bind(milestone.due_date)
        .bind(milestone.id)
        .bind(milestone.entry_id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update milestone")?;

        self.get_milestone(milestone.entry_id, milestone.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Milestone not found after update"))
    }

    async fn delete_milestone(&self, entry_id: i64, milestone_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM build_in_public_milestones WHERE id = ? AND entry_id = ?")
            .bind(milestone_id)
            .bind(entry_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete milestone")?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM build_in_public")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count build-in-public entries")?;
        Ok(row.get("count"))
    }
}

fn row_to_entry(row: &SqliteRow) -> Result<BuildInPublic> {
    let status: String = row.get("status");
    let status = ProgressStatus::parse(&status)
        .with_context(|| format!("Invalid build-in-public status in database: {}", status))?;
    let tags: String = row.get("tags");

    Ok(BuildInPublic {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        content: row.get("content"),
        image: row.get("image"),
        tags: decode_string_list(&tags),
        status,
        progress: row.get("progress"),
        milestones: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_milestone(row: &SqliteRow) -> Milestone {
    Milestone {
        id: row.get("id"),
        entry_id: row.get("entry_id"),
        title: row.get("title"),
        description: row.get("description"),
        completed: row.get("completed"),
        completed_at: row.get("completed_at"),
        due_date: row.get("due_date"),
        created_at: row.get("created_at"),
    }
}
