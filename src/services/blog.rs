//! Blog service
//!
//! Markdown is rendered on every content change; reading time and, when
//! the author gave none, the excerpt are derived from the same source.
//! Drafts are invisible to everyone but admins.

use crate::db::repositories::{BlogRepository, BLOG_SORT_FIELDS};
use crate::models::{
    Blog, BlogFilter, Comment, CreateBlogInput, CreateCommentInput, ListParams, PagedResult,
    UpdateBlogInput, User,
};
use crate::services::content::{
    clean_list, optional_text, parse_sort, patch_optional, patch_required, require_text, write_error,
    ContentServiceError,
};
use crate::services::markdown::MarkdownRenderer;
use chrono::Utc;
use std::sync::Arc;

/// Characters kept in a generated excerpt
pub const EXCERPT_LENGTH: usize = 200;

/// Longest accepted comment
pub const MAX_COMMENT_LENGTH: usize = 2000;

/// Generate a URL-friendly slug from a title.
///
/// Lowercases, maps separators and ASCII punctuation to single hyphens and
/// keeps non-ASCII letters as they are.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut prev_hyphen = true;

    for c in title.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

pub struct BlogService {
    repo: Arc<dyn BlogRepository>,
    renderer: MarkdownRenderer,
}

impl BlogService {
    pub fn new(repo: Arc<dyn BlogRepository>, renderer: MarkdownRenderer) -> Self {
        Self { repo, renderer }
    }

    pub async fn list(
        &self,
        mut filter: BlogFilter,
        sort: Option<&str>,
        params: &ListParams,
        is_admin: bool,
    ) -> Result<PagedResult<Blog>, ContentServiceError> {
        let sort = parse_sort(sort, BLOG_SORT_FIELDS)?;
        filter.published_only = !is_admin;
        Ok(self.repo.list(&filter, &sort, params).await?)
    }

    /// Look a post up by numeric id, then by slug (slugs may be all digits)
    async fn find(&self, id_or_slug: &str, is_admin: bool) -> Result<Blog, ContentServiceError> {
        let visible = |blog: &Blog| is_admin || blog.is_published();

        if let Ok(id) = id_or_slug.parse::<i64>() {
            if let Some(blog) = self.repo.get_by_id(id).await?.filter(visible) {
                return Ok(blog);
            }
        }

        self.repo
            .get_by_slug(id_or_slug)
            .await?
            .filter(visible)
            .ok_or_else(|| ContentServiceError::not_found("Blog", id_or_slug))
    }

    async fn get_existing(&self, id: i64) -> Result<Blog, ContentServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ContentServiceError::not_found("Blog", id))
    }

    /// Fetch a post for reading and count the view
    pub async fn view(&self, id_or_slug: &str, is_admin: bool) -> Result<Blog, ContentServiceError> {
        let mut blog = self.find(id_or_slug, is_admin).await?;
        if self.repo.increment_views(blog.id).await? {
            blog.views += 1;
        }
        Ok(blog)
    }

    /// `author_id` is `None` for seeded content
    pub async fn create(&self, input: CreateBlogInput, author_id: Option<i64>) -> Result<Blog, ContentServiceError> {
        let title = require_text(&input.title, "Please add a title")?;
        let content = require_text(&input.content, "Please add some content")?;

        let slug = match optional_text(input.slug) {
            Some(slug) => {
                let slug = generate_slug(&slug);
                if slug.is_empty() {
                    return Err(ContentServiceError::Validation("Slug must contain letters or digits".to_string()));
                }
                if self.repo.get_by_slug(&slug).await?.is_some() {
                    return Err(ContentServiceError::Duplicate("Duplicate field value entered".to_string()));
                }
                slug
            }
            None => self.unique_slug(&title).await?,
        };

        let now = Utc::now();
        let blog = Blog {
            id: 0,
            excerpt: optional_text(input.excerpt).or_else(|| Some(self.renderer.excerpt(&content, EXCERPT_LENGTH))),
            content_html: self.renderer.render(&content),
            reading_time: self.renderer.reading_time(&content),
            title,
            slug,
            content,
            cover_image: optional_text(input.cover_image),
            tags: clean_list(input.tags),
            category: optional_text(input.category),
            status: input.status.unwrap_or_default(),
            featured: input.featured.unwrap_or(false),
            views: 0,
            likes: 0,
            author_id,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&blog).await.map_err(write_error)?;
        tracing::info!(blog_id = created.id, slug = %created.slug, "blog created");
        Ok(created)
    }

    /// Slug derived from the title, suffixed until unused
    async fn unique_slug(&self, title: &str) -> Result<String, ContentServiceError> {
        let base = match generate_slug(title) {
            s if s.is_empty() => format!("post-{}", Utc::now().timestamp()),
            s => s,
        };

        let mut candidate = base.clone();
        let mut n = 2;
        while self.repo.get_by_slug(&candidate).await?.is_some() {
            candidate = format!("{}-{}", base, n);
            n += 1;
        }
        Ok(candidate)
    }

    pub async fn update(&self, id: i64, input: UpdateBlogInput) -> Result<Blog, ContentServiceError> {
        let mut blog = self.get_existing(id).await?;

        patch_required(&mut blog.title, input.title, "Please add a title")?;
        if let Some(slug) = optional_text(input.slug) {
            let slug = generate_slug(&slug);
            if slug.is_empty() {
                return Err(ContentServiceError::Validation("Slug must contain letters or digits".to_string()));
            }
            if slug != blog.slug {
                if self.repo.get_by_slug(&slug).await?.is_some() {
                    return Err(ContentServiceError::Duplicate("Duplicate field value entered".to_string()));
                }
                blog.slug = slug;
            }
        }
        if let Some(content) = input.content {
            blog.content = require_text(&content, "Please add some content")?;
            blog.content_html = self.renderer.render(&blog.content);
            blog.reading_time = self.renderer.reading_time(&blog.content);
        }
        patch_optional(&mut blog.excerpt, input.excerpt);
        patch_optional(&mut blog.cover_image, input.cover_image);
        patch_optional(&mut blog.category, input.category);
        if let Some(tags) = input.tags {
            blog.tags = clean_list(tags);
        }
        if let Some(status) = input.status {
            blog.status = status;
        }
        if let Some(featured) = input.featured {
            blog.featured = featured;
        }

        self.repo.update(&blog).await.map_err(write_error)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentServiceError> {
        self.get_existing(id).await?;
        self.repo.delete(id).await?;
        tracing::info!(blog_id = id, "blog deleted");
        Ok(())
    }

    pub async fn like(&self, id: i64, is_admin: bool) -> Result<Blog, ContentServiceError> {
        let blog = self.find(&id.to_string(), is_admin).await?;
        self.repo.increment_likes(blog.id).await?;
        self.get_existing(blog.id).await
    }

    pub async fn add_comment(
        &self,
        id: i64,
        user: &User,
        input: CreateCommentInput,
    ) -> Result<Blog, ContentServiceError> {
        let blog = self.find(&id.to_string(), user.is_admin()).await?;

        let content = require_text(&input.content, "Please add a comment")?;
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(ContentServiceError::Validation(format!(
                "Comment can not be more than {} characters",
                MAX_COMMENT_LENGTH
            )));
        }
        let name = optional_text(input.name).unwrap_or_else(|| user.name.clone());

        self.repo
            .add_comment(&Comment {
                id: 0,
                blog_id: blog.id,
                user_id: Some(user.id),
                name,
                content,
                created_at: Utc::now(),
            })
            .await?;

        self.get_existing(blog.id).await
    }

    /// Comment authors and admins may delete a comment
    pub async fn delete_comment(&self, id: i64, comment_id: i64, user: &User) -> Result<Blog, ContentServiceError> {
        let blog = self.get_existing(id).await?;
        let comment = self
            .repo
            .get_comment(blog.id, comment_id)
            .await?
            .ok_or_else(|| ContentServiceError::not_found("Comment", comment_id))?;

        let is_author = comment.user_id == Some(user.id);
        if !is_author && !user.is_admin() {
            return Err(ContentServiceError::Forbidden(
                "Not authorized to delete this comment".to_string(),
            ));
        }

        self.repo.delete_comment(comment.id).await?;
        self.get_existing(blog.id).await
    }

    pub async fn count(&self) -> Result<i64, ContentServiceError> {
        Ok(self.repo.count().await?)
    }
}
