//! Blog model
//!
//! Markdown posts with rendered HTML, engagement counters and reader
//! comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Blog post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    pub id: i64,
    pub title: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    pub excerpt: Option<String>,
    /// Markdown source
    pub content: String,
    /// Rendered HTML
    pub content_html: String,
    pub cover_image: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub status: BlogStatus,
    pub featured: bool,
    /// Estimated reading time in minutes
    pub reading_time: i64,
    pub views: i64,
    pub likes: i64,
    pub author_id: Option<i64>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Blog {
    pub fn is_published(&self) -> bool {
        self.status == BlogStatus::Published
    }
}

/// Blog publication status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogStatus {
    /// Only visible to admins
    #[default]
    Draft,
    /// Visible to everyone
    Published,
}

impl BlogStatus {
    /// Convert status to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BlogStatus::Draft => "draft",
            BlogStatus::Published => "published",
        }
    }

    /// Parse status from database string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(BlogStatus::Draft),
            "published" => Some(BlogStatus::Published),
            _ => None,
        }
    }
}

impl std::fmt::Display for BlogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reader comment attached to a blog post
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub blog_id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a blog post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlogInput {
    #[serde(default)]
    pub title: String,
    /// Generated from the title when absent
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: String,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub status: Option<BlogStatus>,
    pub featured: Option<bool>,
}

/// Partial update for a blog post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlogInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub status: Option<BlogStatus>,
    pub featured: Option<bool>,
}

/// Input for commenting on a post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCommentInput {
    /// Defaults to the commenter's account name
    pub name: Option<String>,
    #[serde(default)]
    pub content: String,
}

/// Filters accepted by the blog list
#[derive(Debug, Clone, Default)]
pub struct BlogFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<BlogStatus>,
    pub featured: Option<bool>,
    pub tag: Option<String>,
    /// Hide drafts (non-admin readers)
    pub published_only: bool,
}
