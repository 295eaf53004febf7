//! Blog repository
//!
//! Posts live in `blogs`, their comments in `blog_comments`. Every read
//! returns the post with its comments attached, oldest comment first.

use crate::db::query::{decode_string_list, encode_string_list, fetch_page, Filter, Filters, SortField, SortSpec};
use crate::db::DynDatabasePool;
use crate::models::{Blog, BlogFilter, BlogStatus, Comment, ListParams, PagedResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

/// Fields a blog list may be sorted by
pub const BLOG_SORT_FIELDS: &[SortSpec] = &[
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
    ("title", "title"),
    ("views", "views"),
    ("likes", "likes"),
    ("reading_time", "reading_time"),
    ("featured", "featured"),
    ("status", "status"),
];

const SEARCH_COLUMNS: &[&str] = &["title", "excerpt", "content"];

#[async_trait]
pub trait BlogRepository: Send + Sync {
    async fn create(&self, blog: &Blog) -> Result<Blog>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Blog>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Blog>>;

    /// Persist editable fields; counters are left alone
    async fn update(&self, blog: &Blog) -> Result<Blog>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn list(&self, filter: &BlogFilter, sort: &[SortField], params: &ListParams) -> Result<PagedResult<Blog>>;

    /// Returns false when the post does not exist
    async fn increment_views(&self, id: i64) -> Result<bool>;

    async fn increment_likes(&self, id: i64) -> Result<bool>;

    async fn add_comment(&self, comment: &Comment) -> Result<Comment>;

    async fn get_comment(&self, blog_id: i64, comment_id: i64) -> Result<Option<Comment>>;

    async fn delete_comment(&self, comment_id: i64) -> Result<()>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxBlogRepository {
    pool: DynDatabasePool,
}

impl SqlxBlogRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BlogRepository> {
        Arc::new(Self::new(pool))
    }

    async fn with_comments(&self, row: Option<SqliteRow>) -> Result<Option<Blog>> {
        match row {
            Some(row) => {
                let mut blog = row_to_blog(&row)?;
                blog.comments = self.comments_for(blog.id).await?;
                Ok(Some(blog))
            }
            None => Ok(None),
        }
    }

    async fn comments_for(&self, blog_id: i64) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT id, blog_id, user_id, name, content, created_at FROM blog_comments \
             WHERE blog_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(blog_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to load blog comments")?;

        Ok(rows.iter().map(row_to_comment).collect())
    }
}

#[async_trait]
impl BlogRepository for SqlxBlogRepository {
    async fn create(&self, blog: &Blog) -> Result<Blog> {
        let now = Utc::now();
        let tags = encode_string_list(&blog.tags)?;

        let result = sqlx::query(
            r#"
            INSERT INTO blogs (title, slug, excerpt, content, content_html, cover_image, tags,
                               category, status, featured, reading_time, views, likes, author_id,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?, ?)
            "#,
        )
        .bind(&blog.title)
        .bind(&blog.slug)
        .bind(&blog.excerpt)
        .bind(&blog.content)
        .bind(&blog.content_html)
        .bind(&blog.cover_image)
        .bind(tags)
        .bind(&blog.category)
        .bind(blog.status.as_str())
        .bind(blog.featured)
        .bind(blog.reading_time)
        .bind(blog.author_id)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create blog")?;

        Ok(Blog {
            id: result.last_insert_rowid(),
            views: 0,
            likes: 0,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
            ..blog.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Blog>> {
        let row = sqlx::query("SELECT * FROM blogs WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get blog by ID")?;

        self.with_comments(row).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Blog>> {
        let row = sqlx::query("SELECT * FROM blogs WHERE slug = ?")
            .bind(slug)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get blog by slug")?;

        self.with_comments(row).await
    }

    async fn update(&self, blog: &Blog) -> Result<Blog> {
        sqlx::query(
            r#"
            UPDATE blogs
            SET title = ?, slug = ?, excerpt = ?, content = ?, content_html = ?, cover_image = ?,
                tags = ?, category = ?, status = ?, featured = ?, reading_time = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&blog.title)
        .bind(&blog.slug)
        .bind(&blog.excerpt)
        .bind(&blog.content)
        .bind(&blog.content_html)
        .bind(&blog.cover_image)
        .bind(encode_string_list(&blog.tags)?)
        .bind(&blog.category)
        .bind(blog.status.as_str())
        .bind(blog.featured)
        .bind(blog.reading_time)
        .bind(Utc::now())
        .bind(blog.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update blog")?;

        self.get_by_id(blog.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Blog not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM blogs WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete blog")?;
        Ok(())
    }

    async fn list(&self, filter: &BlogFilter, sort: &[SortField], params: &ListParams) -> Result<PagedResult<Blog>> {
        let mut filters = Filters::new();
        filters
            .search(SEARCH_COLUMNS, filter.search.as_deref())
            .text("category", filter.category.as_deref())
            .flag("featured", filter.featured)
            .contains("tags", filter.tag.as_deref());
        if filter.published_only {
            filters.push(Filter::text("status", BlogStatus::Published.as_str()));
        } else if let Some(status) = filter.status {
            filters.push(Filter::text("status", status.as_str()));
        }

        let (rows, total) = fetch_page(self.pool.sqlite(), "blogs", filters.as_slice(), sort, params).await?;

        let mut blogs = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut blog = row_to_blog(row)?;
            blog.comments = self.comments_for(blog.id).await?;
            blogs.push(blog);
        }

        Ok(PagedResult::new(blogs, total, params))
    }

    async fn increment_views(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE blogs SET views = views + 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to increment blog views")?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_likes(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE blogs SET likes = likes + 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to increment blog likes")?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_comment(&self, comment: &Comment) -> Result<Comment> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO blog_comments (blog_id, user_id, name, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(comment.blog_id)
        .bind(comment.user_id)
        .bind(&comment.name)
        .bind(&comment.content)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to add comment")?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            created_at: now,
            ..comment.clone()
        })
    }

    async fn get_comment(&self, blog_id: i64, comment_id: i64) -> Result<Option<Comment>> {
        let row = sqlx::query(
            "SELECT id, blog_id, user_id, name, content, created_at FROM blog_comments \
             WHERE id = ? AND blog_id = ?",
        )
        .bind(comment_id)
        .bind(blog_id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get comment")?;

        Ok(row.as_ref().map(row_to_comment))
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM blog_comments WHERE id = ?")
            .bind(comment_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete comment")?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM blogs")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count blogs")?;
        Ok(row.get("count"))
    }
}

fn row_to_blog(row: &SqliteRow) -> Result<Blog> {
    let status: String = row.get("status");
    let status = BlogStatus::parse(&status).with_context(|| format!("Invalid blog status in database: {}", status))?;
    let tags: String = row.get("tags");

    Ok(Blog {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        cover_image: row.get("cover_image"),
        tags: decode_string_list(&tags),
        category: row.get("category"),
        status,
        featured: row.get("featured"),
        reading_time: row.get("reading_time"),
        views: row.get("views"),
        likes: row.get("likes"),
        author_id: row.get("author_id"),
        comments: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_comment(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        blog_id: row.get("blog_id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations::run_migrations};

    async fn setup_test_repo() -> SqlxBlogRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        SqlxBlogRepository::new(pool)
    }

    fn blog(slug: &str, status: BlogStatus, tags: &[&str]) -> Blog {
        let now = Utc::now();
        Blog {
            id: 0,
            title: format!("Post {}", slug),
            slug: slug.to_string(),
            excerpt: None,
            content: "Body text".to_string(),
            content_html: "<p>Body text</p>".to_string(),
            cover_image: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            category: Some("dev".to_string()),
            status,
            featured: false,
            reading_time: 1,
            views: 0,
            likes: 0,
            author_id: None,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_by_id_or_slug() {
        let repo = setup_test_repo().await;
        let created = repo.create(&blog("hello", BlogStatus::Published, &["rust"])).await.unwrap();

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.slug, "hello");
        assert_eq!(by_id.tags, vec!["rust".to_string()]);
        assert_eq!(by_id.category.as_deref(), Some("dev"));

        let by_slug = repo.get_by_slug("hello").await.unwrap().unwrap();
        assert_eq!(by_slug.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_slug_fails() {
        let repo = setup_test_repo().await;
        repo.create(&blog("same", BlogStatus::Draft, &[])).await.unwrap();
        assert!(repo.create(&blog("same", BlogStatus::Draft, &[])).await.is_err());
    }

    #[tokio::test]
    async fn test_list_hides_drafts_and_filters_tags() {
        let repo = setup_test_repo().await;
        repo.create(&blog("a", BlogStatus::Published, &["rust"])).await.unwrap();
        repo.create(&blog("b", BlogStatus::Draft, &["rust"])).await.unwrap();
        repo.create(&blog("c", BlogStatus::Published, &["go"])).await.unwrap();

        let public = BlogFilter {
            published_only: true,
            ..Default::default()
        };
        let page = repo.list(&public, &[], &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 2);

        let tagged = BlogFilter {
            tag: Some("rust".to_string()),
            ..Default::default()
        };
        let page = repo.list(&tagged, &[], &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].slug, "b", "newest first");
    }

    #[tokio::test]
    async fn test_counters_and_comments() {
        let repo = setup_test_repo().await;
        let created = repo.create(&blog("c", BlogStatus::Published, &[])).await.unwrap();

        assert!(repo.increment_views(created.id).await.unwrap());
        assert!(repo.increment_likes(created.id).await.unwrap());
        assert!(repo.increment_likes(created.id).await.unwrap());
        assert!(!repo.increment_likes(9999).await.unwrap());

        let comment = repo
            .add_comment(&Comment {
                id: 0,
                blog_id: created.id,
                user_id: None,
                name: "Reader".to_string(),
                content: "Nice".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let loaded = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.views, 1);
        assert_eq!(loaded.likes, 2);
        assert_eq!(loaded.comments.len(), 1);

        assert!(repo.get_comment(created.id + 1, comment.id).await.unwrap().is_none());
        repo.delete_comment(comment.id).await.unwrap();
        let loaded = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert!(loaded.comments.is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_counters() {
        let repo = setup_test_repo().await;
        let mut created = repo.create(&blog("u", BlogStatus::Draft, &[])).await.unwrap();
        repo.increment_views(created.id).await.unwrap();

        created.title = "Renamed".to_string();
        created.status = BlogStatus::Published;
        let updated = repo.update(&created).await.unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.status, BlogStatus::Published);
        assert_eq!(updated.views, 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_comments() {
        let repo = setup_test_repo().await;
        let created = repo.create(&blog("d", BlogStatus::Published, &[])).await.unwrap();
        repo.add_comment(&Comment {
            id: 0,
            blog_id: created.id,
            user_id: None,
            name: "x".to_string(),
            content: "y".to_string(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blog_comments")
            .fetch_one(repo.pool.sqlite())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }
}
