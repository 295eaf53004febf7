//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They are
//! responsible for:
//! - Validating and normalising input
//! - Enforcing ownership and visibility rules
//! - Deriving fields (slugs, rendered HTML, reading time, progress)
//! - Issuing and checking credentials

pub mod auth;
pub mod blog;
pub mod build_in_public;
pub mod content;
pub mod email;
pub mod markdown;
pub mod motivation;
pub mod password;
pub mod project;
pub mod task;
pub mod token;

pub use auth::{AuthService, AuthServiceError, AuthSession};
pub use blog::{generate_slug, BlogService};
pub use build_in_public::BuildInPublicService;
pub use content::ContentServiceError;
pub use email::{EmailService, LogMailer, Mailer, SmtpMailer};
pub use markdown::MarkdownRenderer;
pub use motivation::MotivationService;
pub use password::{hash_password, verify_password};
pub use project::ProjectService;
pub use task::TaskService;
pub use token::{Claims, TokenService};
