//! Authentication service
//!
//! Registration (the first account becomes admin), login, profile and
//! password changes, and the forgot/reset password flow. Every successful
//! sign-in style operation returns an [`AuthSession`]: the user plus a
//! freshly signed token.

use crate::db::is_unique_violation;
use crate::db::repositories::UserRepository;
use crate::models::{CreateUserInput, UpdateProfileInput, User, UserRole};
use crate::services::email::EmailService;
use crate::services::password::{hash_password, is_acceptable_password, verify_password, MIN_PASSWORD_LENGTH};
use crate::services::token::{generate_reset_token, hash_reset_token, TokenService};
use anyhow::Context;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Longest accepted display name
pub const MAX_NAME_LENGTH: usize = 50;

/// Error types for authentication operations
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    /// Invalid input
    #[error("{0}")]
    Validation(String),

    /// Email already registered
    #[error("{0}")]
    Duplicate(String),

    /// Missing, wrong or expired credentials
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    /// Reset mail could not be delivered
    #[error("Email could not be sent")]
    EmailFailed,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// A signed-in user and their bearer token
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    tokens: TokenService,
    email: EmailService,
    reset_token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        tokens: TokenService,
        email: EmailService,
        reset_token_expire_minutes: i64,
    ) -> Self {
        Self {
            user_repo,
            tokens,
            email,
            reset_token_ttl: Duration::minutes(reset_token_expire_minutes.max(1)),
        }
    }

    fn session(&self, user: User) -> Result<AuthSession, AuthServiceError> {
        let token = self.tokens.issue(&user)?;
        Ok(AuthSession { user, token })
    }

    /// Register a new account.
    ///
    /// The first account in an empty database is made admin.
    pub async fn register(&self, input: CreateUserInput) -> Result<AuthSession, AuthServiceError> {
        let name = validate_name(&input.name)?;
        let email = validate_email(&input.email)?;
        if !is_acceptable_password(&input.password) {
            return Err(password_too_short());
        }

        if self.user_repo.get_by_email(&email).await?.is_some() {
            return Err(duplicate_email());
        }

        let role = if self.user_repo.count().await? == 0 {
            UserRole::Admin
        } else {
            UserRole::User
        };

        let password_hash = hash_password(&input.password)?;
        let user = User::new(name, email, password_hash, role);

        let created = match self.user_repo.create(&user).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => return Err(duplicate_email()),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user_id = created.id, role = %created.role, "user registered");
        self.session(created)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthServiceError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(AuthServiceError::Validation(
                "Please provide an email and password".to_string(),
            ));
        }

        let user = self
            .user_repo
            .get_by_email(&email)
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(password, &user.password_hash).context("Failed to verify password")? {
            return Err(invalid_credentials());
        }

        self.session(user)
    }

    /// Resolve a bearer token to its user
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthServiceError> {
        let claims = self.tokens.verify(token).map_err(|_| not_authorized())?;
        self.user_repo
            .get_by_id(claims.sub)
            .await?
            .ok_or_else(not_authorized)
    }

    pub async fn get_user(&self, id: i64) -> Result<User, AuthServiceError> {
        self.user_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AuthServiceError::NotFound(format!("User not found with id of {}", id)))
    }

    pub async fn update_profile(&self, user_id: i64, input: UpdateProfileInput) -> Result<User, AuthServiceError> {
        let mut user = self.get_user(user_id).await?;

        if let Some(name) = input.name {
            user.name = validate_name(&name)?;
        }
        if let Some(email) = input.email {
            let email = validate_email(&email)?;
            if email != user.email {
                if let Some(other) = self.user_repo.get_by_email(&email).await? {
                    if other.id != user.id {
                        return Err(duplicate_email());
                    }
                }
                user.email = email;
            }
        }

        match self.user_repo.update(&user).await {
            Ok(updated) => Ok(updated),
            Err(e) if is_unique_violation(&e) => Err(duplicate_email()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<AuthSession, AuthServiceError> {
        let mut user = self.get_user(user_id).await?;

        if !verify_password(current_password, &user.password_hash).context("Failed to verify password")? {
            return Err(AuthServiceError::Unauthorized("Password is incorrect".to_string()));
        }
        if !is_acceptable_password(new_password) {
            return Err(password_too_short());
        }

        user.password_hash = hash_password(new_password)?;
        let updated = self.user_repo.update(&user).await?;
        self.session(updated)
    }

    /// Store a reset token digest and mail the plain token.
    ///
    /// A delivery failure clears the stored token again.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthServiceError> {
        let email = email.trim().to_lowercase();
        let mut user = self
            .user_repo
            .get_by_email(&email)
            .await?
            .ok_or_else(|| AuthServiceError::NotFound("There is no user with that email".to_string()))?;

        let (token, digest) = generate_reset_token();
        user.reset_password_token = Some(digest);
        user.reset_password_expire = Some(Utc::now() + self.reset_token_ttl);
        let mut user = self.user_repo.update(&user).await?;

        if let Err(e) = self.email.send_password_reset(&user.email, &token).await {
            tracing::warn!(user_id = user.id, "reset email failed: {:#}", e);
            user.reset_password_token = None;
            user.reset_password_expire = None;
            self.user_repo.update(&user).await?;
            return Err(AuthServiceError::EmailFailed);
        }

        tracing::info!(user_id = user.id, "password reset requested");
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> Result<AuthSession, AuthServiceError> {
        let digest = hash_reset_token(token);
        let mut user = self
            .user_repo
            .get_by_reset_token(&digest, Utc::now())
            .await?
            .ok_or_else(|| AuthServiceError::Validation("Invalid token".to_string()))?;

        if !is_acceptable_password(password) {
            return Err(password_too_short());
        }

        user.password_hash = hash_password(password)?;
        user.reset_password_token = None;
        user.reset_password_expire = None;
        let updated = self.user_repo.update(&user).await?;

        self.session(updated)
    }
}

fn validate_name(name: &str) -> Result<String, AuthServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthServiceError::Validation("Please add a name".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthServiceError::Validation(format!(
            "Name can not be more than {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

fn validate_email(email: &str) -> Result<String, AuthServiceError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AuthServiceError::Validation("Please add an email".to_string()));
    }
    if !EMAIL_RE.is_match(&email) {
        return Err(AuthServiceError::Validation("Please add a valid email".to_string()));
    }
    Ok(email)
}

fn password_too_short() -> AuthServiceError {
    AuthServiceError::Validation(format!(
        "Password must be at least {} characters",
        MIN_PASSWORD_LENGTH
    ))
}

fn duplicate_email() -> AuthServiceError {
    AuthServiceError::Duplicate("Duplicate field value entered".to_string())
}

fn invalid_credentials() -> AuthServiceError {
    AuthServiceError::Unauthorized("Invalid credentials".to_string())
}

fn not_authorized() -> AuthServiceError {
    AuthServiceError::Unauthorized("Not authorized to access this route".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::services::email::{LogMailer, Mailer};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
            anyhow::bail!("smtp down")
        }
    }

    #[derive(Default)]
    struct CapturingMailer {
        bodies: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Mailer for CapturingMailer {
        async fn send(&self, _to: &str, _subject: &str, body: &str) -> anyhow::Result<()> {
            self.bodies.lock().unwrap().push(body.to_string());
            Ok(())
        }
    }

    async fn setup_with_mailer(mailer: Arc<dyn Mailer>) -> (Arc<dyn UserRepository>, AuthService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");

        let repo = SqlxUserRepository::boxed(pool);
        let service = AuthService::new(
            repo.clone(),
            TokenService::new("test-secret", 30),
            EmailService::new(mailer, "http://localhost:5000"),
            10,
        );
        (repo, service)
    }

    async fn setup_test_service() -> (Arc<dyn UserRepository>, AuthService) {
        setup_with_mailer(Arc::new(LogMailer)).await
    }

    fn register_input(name: &str, email: &str, password: &str) -> CreateUserInput {
        CreateUserInput {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_user_becomes_admin() {
        let (_repo, service) = setup_test_service().await;

        let first = service
            .register(register_input("Owner", "Owner@Example.com", "secret1"))
            .await
            .expect("Failed to register");
        let second = service
            .register(register_input("Guest", "guest@example.com", "secret2"))
            .await
            .expect("Failed to register");

        assert_eq!(first.user.role, UserRole::Admin);
        assert_eq!(first.user.email, "owner@example.com");
        assert_eq!(second.user.role, UserRole::User);
        assert!(!first.token.is_empty());
    }

    #[tokio::test]
    async fn test_register_duplicate_email_fails() {
        let (_repo, service) = setup_test_service().await;
        service.register(register_input("A", "same@example.com", "secret1")).await.unwrap();

        let result = service.register(register_input("B", "SAME@example.com", "secret2")).await;
        assert!(matches!(result, Err(AuthServiceError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (_repo, service) = setup_test_service().await;

        let short = service.register(register_input("A", "a@example.com", "12345")).await;
        assert!(matches!(short, Err(AuthServiceError::Validation(m)) if m.contains("at least 6")));

        let bad_email = service.register(register_input("A", "not-an-email", "123456")).await;
        assert!(matches!(bad_email, Err(AuthServiceError::Validation(_))));

        let no_name = service.register(register_input("  ", "a@example.com", "123456")).await;
        assert!(matches!(no_name, Err(AuthServiceError::Validation(m)) if m == "Please add a name"));
    }

    #[tokio::test]
    async fn test_login() {
        let (_repo, service) = setup_test_service().await;
        service.register(register_input("A", "a@example.com", "secret1")).await.unwrap();

        let session = service.login("A@example.com", "secret1").await.expect("login");
        assert_eq!(session.user.email, "a@example.com");

        let wrong = service.login("a@example.com", "nope").await;
        assert!(matches!(wrong, Err(AuthServiceError::Unauthorized(m)) if m == "Invalid credentials"));

        let unknown = service.login("b@example.com", "secret1").await;
        assert!(matches!(unknown, Err(AuthServiceError::Unauthorized(_))));

        let missing = service.login("", "secret1").await;
        assert!(matches!(missing, Err(AuthServiceError::Validation(m)) if m == "Please provide an email and password"));
    }

    #[tokio::test]
    async fn test_authenticate_token() {
        let (_repo, service) = setup_test_service().await;
        let session = service.register(register_input("A", "a@example.com", "secret1")).await.unwrap();

        let user = service.authenticate(&session.token).await.unwrap();
        assert_eq!(user.id, session.user.id);

        assert!(matches!(
            service.authenticate("garbage").await,
            Err(AuthServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_update_profile_enforces_unique_email() {
        let (_repo, service) = setup_test_service().await;
        let a = service.register(register_input("A", "a@example.com", "secret1")).await.unwrap();
        service.register(register_input("B", "b@example.com", "secret1")).await.unwrap();

        let renamed = service
            .update_profile(
                a.user.id,
                UpdateProfileInput {
                    name: Some("Alice".to_string()),
                    email: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Alice");

        let clash = service
            .update_profile(
                a.user.id,
                UpdateProfileInput {
                    name: None,
                    email: Some("b@example.com".to_string()),
                },
            )
            .await;
        assert!(matches!(clash, Err(AuthServiceError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_update_password() {
        let (_repo, service) = setup_test_service().await;
        let a = service.register(register_input("A", "a@example.com", "secret1")).await.unwrap();

        let wrong = service.update_password(a.user.id, "nope", "newsecret").await;
        assert!(matches!(wrong, Err(AuthServiceError::Unauthorized(m)) if m == "Password is incorrect"));

        service.update_password(a.user.id, "secret1", "newsecret").await.unwrap();
        assert!(service.login("a@example.com", "secret1").await.is_err());
        assert!(service.login("a@example.com", "newsecret").await.is_ok());
    }

    #[tokio::test]
    async fn test_forgot_and_reset_password() {
        let mailer = Arc::new(CapturingMailer::default());
        let (repo, service) = setup_with_mailer(mailer.clone()).await;
        service.register(register_input("A", "a@example.com", "secret1")).await.unwrap();

        service.forgot_password("a@example.com").await.unwrap();
        let body = mailer.bodies.lock().unwrap()[0].clone();
        let token = body
            .split("/api/auth/resetpassword/")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .expect("reset link in mail")
            .to_string();

        let stored = repo.get_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(stored.reset_password_token, Some(hash_reset_token(&token)));

        let session = service.reset_password(&token, "brandnew").await.unwrap();
        assert!(session.user.reset_password_token.is_none());
        assert!(service.login("a@example.com", "brandnew").await.is_ok());

        let reused = service.reset_password(&token, "another1").await;
        assert!(matches!(reused, Err(AuthServiceError::Validation(m)) if m == "Invalid token"));
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email() {
        let (_repo, service) = setup_test_service().await;
        let result = service.forgot_password("ghost@example.com").await;
        assert!(matches!(result, Err(AuthServiceError::NotFound(m)) if m == "There is no user with that email"));
    }

    #[tokio::test]
    async fn test_failed_delivery_clears_token() {
        let (repo, service) = setup_with_mailer(Arc::new(FailingMailer)).await;
        service.register(register_input("A", "a@example.com", "secret1")).await.unwrap();

        let result = service.forgot_password("a@example.com").await;
        assert!(matches!(result, Err(AuthServiceError::EmailFailed)));

        let stored = repo.get_by_email("a@example.com").await.unwrap().unwrap();
        assert!(stored.reset_password_token.is_none());
        assert!(stored.reset_password_expire.is_none());
    }
}
