//! Data models
//!
//! Entities stored by the portfolio backend, the inputs accepted to create
//! and update them, and the pagination types shared by list endpoints.

mod blog;
mod build_in_public;
mod motivation;
mod project;
mod query;
mod task;
mod user;

pub use blog::{Blog, BlogFilter, BlogStatus, Comment, CreateBlogInput, CreateCommentInput, UpdateBlogInput};
pub use build_in_public::{
    milestone_progress, BuildInPublic, BuildInPublicFilter, CreateBuildInPublicInput,
    CreateMilestoneInput, Milestone, UpdateBuildInPublicInput, UpdateMilestoneInput,
};
pub use motivation::{CreateMotivationInput, Motivation, MotivationFilter, MotivationKind, UpdateMotivationInput};
pub use project::{
    CreateProjectInput, CreateProjectPostInput, ProgressStatus, Project, ProjectFilter, ProjectPost,
    UpdateProjectInput,
};
pub use query::{ListParams, PageLink, PagedResult, Pagination, DEFAULT_PER_PAGE, MAX_PER_PAGE};
pub use task::{
    ChecklistItem, CreateChecklistItemInput, CreateTaskInput, Task, TaskFilter, TaskPriority, TaskStatus,
    UpdateChecklistItemInput, UpdateTaskInput,
};
pub use user::{CreateUserInput, UpdateProfileInput, User, UserRole};

use serde::{Deserialize, Deserializer};

/// Reads a clearable update field: a missing key stays `None` (unchanged)
/// while an explicit `null` becomes `Some(None)`. Pair with `#[serde(default)]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
