//! Demo content for a fresh database
//!
//! Runs at startup when `database.seed` is enabled. Nothing is written
//! unless every content table is empty, so restarting a seeded instance
//! is a no-op. No user accounts are created: the first registration
//! becomes the admin.

use anyhow::Result;

use crate::db::repositories::{
    SqlxBlogRepository, SqlxBuildInPublicRepository, SqlxMotivationRepository, SqlxProjectRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{
    BlogStatus, CreateBlogInput, CreateBuildInPublicInput, CreateMilestoneInput, CreateMotivationInput,
    CreateProjectInput, CreateProjectPostInput, MotivationKind, ProgressStatus,
};
use crate::services::{BlogService, BuildInPublicService, MarkdownRenderer, MotivationService, ProjectService};

/// What a seeding run inserted
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub blogs: usize,
    pub projects: usize,
    pub build_in_public: usize,
    pub motivations: usize,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        *self == SeedReport::default()
    }
}

/// Seed demo content if the database holds no content yet
pub async fn seed_if_empty(pool: &DynDatabasePool) -> Result<SeedReport> {
    let blogs = BlogService::new(SqlxBlogRepository::boxed(pool.clone()), MarkdownRenderer::new());
    let projects = ProjectService::new(SqlxProjectRepository::boxed(pool.clone()));
    let entries = BuildInPublicService::new(SqlxBuildInPublicRepository::boxed(pool.clone()));
    let motivations = MotivationService::new(SqlxMotivationRepository::boxed(pool.clone()));

    let existing = blogs.count().await? + projects.count().await? + entries.count().await? + motivations.count().await?;
    if existing > 0 {
        tracing::debug!(existing, "Database already has content, skipping seed");
        return Ok(SeedReport::default());
    }

    let mut report = SeedReport::default();

    for (title, tags, content) in [
        (
            "Hello, world",
            vec!["meta"],
            "# Hello, world\n\nThis portfolio now runs on a small **Rust** API backed by SQLite.",
        ),
        (
            "Notes on building in public",
            vec!["process", "writing"],
            "Shipping small updates every week keeps a project honest.\n\n- write it down\n- ship it\n- repeat",
        ),
    ] {
        blogs
            .create(
                CreateBlogInput {
                    title: title.to_string(),
                    content: content.to_string(),
                    tags: tags.into_iter().map(String::from).collect(),
                    category: Some("General".to_string()),
                    status: Some(BlogStatus::Published),
                    ..Default::default()
                },
                None,
            )
            .await?;
        report.blogs += 1;
    }

    let project = projects
        .create(CreateProjectInput {
            title: "Portfolio API".to_string(),
            description: "REST backend for this site".to_string(),
            technologies: vec!["Rust".into(), "axum".into(), "SQLite".into()],
            category: Some("Web".to_string()),
            status: Some(ProgressStatus::Completed),
            featured: Some(true),
            ..Default::default()
        })
        .await?;
    projects
        .add_post(
            project.id,
            CreateProjectPostInput {
                title: "First release".to_string(),
                content: "Auth, content types and uploads are live.".to_string(),
            },
        )
        .await?;
    report.projects += 1;

    let entry = entries
        .create(CreateBuildInPublicInput {
            title: "Launching the portfolio".to_string(),
            description: "Tracking the rebuild week by week".to_string(),
            tags: vec!["portfolio".into()],
            status: Some(ProgressStatus::InProgress),
            ..Default::default()
        })
        .await?;
    for (title, completed) in [("Backend", true), ("Frontend", false)] {
        entries
            .add_milestone(
                entry.id,
                CreateMilestoneInput {
                    title: title.to_string(),
                    completed,
                    ..Default::default()
                },
            )
            .await?;
    }
    report.build_in_public += 1;

    for (content, author) in [
        ("Make it work, make it right, make it fast.", "Kent Beck"),
        ("Simplicity is prerequisite for reliability.", "Edsger W. Dijkstra"),
    ] {
        motivations
            .create(CreateMotivationInput {
                kind: Some(MotivationKind::Quote),
                content: content.to_string(),
                author: Some(author.to_string()),
                tags: vec!["engineering".into()],
                ..Default::default()
            })
            .await?;
        report.motivations += 1;
    }

    tracing::info!(
        blogs = report.blogs,
        projects = report.projects,
        build_in_public = report.build_in_public,
        motivations = report.motivations,
        "Demo content seeded"
    );
    Ok(report)
}
