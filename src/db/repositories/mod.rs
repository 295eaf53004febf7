//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod blog;
pub mod build_in_public;
pub mod motivation;
pub mod project;
pub mod task;
pub mod user;

pub use blog::{BlogRepository, SqlxBlogRepository, BLOG_SORT_FIELDS};
pub use build_in_public::{BuildInPublicRepository, SqlxBuildInPublicRepository, BUILD_IN_PUBLIC_SORT_FIELDS};
pub use motivation::{Counter, MotivationRepository, SqlxMotivationRepository, MOTIVATION_SORT_FIELDS};
pub use project::{ProjectRepository, SqlxProjectRepository, PROJECT_SORT_FIELDS};
pub use task::{SqlxTaskRepository, TaskRepository, TASK_SORT_FIELDS};
pub use user::{SqlxUserRepository, UserRepository};
