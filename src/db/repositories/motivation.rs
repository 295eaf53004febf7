//! Motivation repository

use crate::db::query::{decode_string_list, encode_string_list, fetch_page, Filter, Filters, SortField, SortSpec};
use crate::db::DynDatabasePool;
use crate::models::{ListParams, Motivation, MotivationFilter, MotivationKind, PagedResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

pub const MOTIVATION_SORT_FIELDS: &[SortSpec] = &[
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
    ("likes", "likes"),
    ("views", "views"),
    ("shares", "shares"),
    ("type", "kind"),
    ("kind", "kind"),
    ("author", "author"),
];

const SEARCH_COLUMNS: &[&str] = &["content", "author"];

/// Engagement counters that readers can bump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Likes,
    Views,
    Shares,
}

impl Counter {
    fn column(&self) -> &'static str {
        match self {
            Counter::Likes => "likes",
            Counter::Views => "views",
            Counter::Shares => "shares",
        }
    }
}

#[async_trait]
pub trait MotivationRepository: Send + Sync {
    async fn create(&self, motivation: &Motivation) -> Result<Motivation>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Motivation>>;

    async fn update(&self, motivation: &Motivation) -> Result<Motivation>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn list(
        &self,
        filter: &MotivationFilter,
        sort: &[SortField],
        params: &ListParams,
    ) -> Result<PagedResult<Motivation>>;

    /// Returns false when the motivation does not exist
    async fn increment(&self, id: i64, counter: Counter) -> Result<bool>;

    async fn random(&self) -> Result<Option<Motivation>>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxMotivationRepository {
    pool: DynDatabasePool,
}

impl SqlxMotivationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MotivationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MotivationRepository for SqlxMotivationRepository {
    async fn create(&self, motivation: &Motivation) -> Result<Motivation> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO motivations (kind, content, author, media_url, tags, likes, views, shares,
                                     created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, 0, 0, ?, ?)
            "#,
        )
        .bind(motivation.kind.as_str())
        .bind(&motivation.content)
        .bind(&motivation.author)
        .bind(&motivation.media_url)
        .bind(encode_string_list(&motivation.tags)?)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create motivation")?;

        Ok(Motivation {
            id: result.last_insert_rowid(),
            likes: 0,
            views: 0,
            shares: 0,
            created_at: now,
            updated_at: now,
            ..motivation.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Motivation>> {
        let row = sqlx::query("SELECT * FROM motivations WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get motivation by ID")?;

        row.as_ref().map(row_to_motivation).transpose()
    }

    async fn update(&self, motivation: &Motivation) -> Result<Motivation> {
        sqlx::query(
            r#"
            UPDATE motivations
            SET kind = ?, content = ?, author = ?, media_url = ?, tags = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(motivation.kind.as_str())
        .bind(&motivation.content)
        .bind(&motivation.author)
        .bind(&motivation.media_url)
        .bind(encode_string_list(&motivation.tags)?)
        .bind(Utc::now())
        .bind(motivation.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update motivation")?;

        self.get_by_id(motivation.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Motivation not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM motivations WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete motivation")?;
        Ok(())
    }

    async fn list(
        &self,
        filter: &MotivationFilter,
        sort: &[SortField],
        params: &ListParams,
    ) -> Result<PagedResult<Motivation>> {
        let mut filters = Filters::new();
        filters
            .search(SEARCH_COLUMNS, filter.search.as_deref())
            .contains("tags", filter.tag.as_deref());
        if let Some(kind) = filter.kind {
            filters.push(Filter::text("kind", kind.as_str()));
        }

        let (rows, total) = fetch_page(self.pool.sqlite(), "motivations", filters.as_slice(), sort, params).await?;
        let items = rows.iter().map(row_to_motivation).collect::<Result<Vec<_>>>()?;

        Ok(PagedResult::new(items, total, params))
    }

    async fn increment(&self, id: i64, counter: Counter) -> Result<bool> {
        let column = counter.column();
        let result = sqlx::query(&format!(
            "UPDATE motivations SET {column} = {column} + 1 WHERE id = ?"
        ))
        .bind(id)
        .execute(self.pool.sqlite())
        .await
        .with_context(|| format!("Failed to increment motivation {}", column))?;
        Ok(result.rows_affected() > 0)
    }

    async fn random(&self) -> Result<Option<Motivation>> {
        let row = sqlx::query("SELECT * FROM motivations ORDER BY RANDOM() LIMIT 1")
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to pick a random motivation")?;

        row.as_ref().map(row_to_motivation).transpose()
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM motivations")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count motivations")?;
        Ok(row.get("count"))
    }
}

fn row_to_motivation(row: &SqliteRow) -> Result<Motivation> {
    let kind: String = row.get("kind");
    let kind = MotivationKind::parse(&kind).with_context(|| format!("Invalid motivation kind in database: {}", kind))?;
    let tags: String = row.get("tags");

    Ok(Motivation {
        id: row.get("id"),
        kind,
        content: row.get("content"),
        author: row.get("author"),
        media_url: row.get("media_url"),
        tags: decode_string_list(&tags),
        likes: row.get("likes"),
        views: row.get("views"),
        shares: row.get("shares"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
