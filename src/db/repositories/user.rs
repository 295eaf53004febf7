//! User repository
//!
//! Database operations for user accounts.

use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, reset_password_token, \
                            reset_password_expire, created_at, updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email (expects a lowercased address)
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find the user holding an unexpired reset token with this digest
    async fn get_by_reset_token(&self, digest: &str, now: DateTime<Utc>) -> Result<Option<User>>;

    /// Update a user
    async fn update(&self, user: &User) -> Result<User>;

    /// Delete a user
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create user")?;

        Ok(User {
            id: result.last_insert_rowid(),
            created_at: now,
            updated_at: now,
            reset_password_token: None,
            reset_password_expire: None,
            ..user.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get user by ID")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(email)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get user by email")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_reset_token(&self, digest: &str, now: DateTime<Utc>) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE reset_password_token = ? AND reset_password_expire > ?",
            USER_COLUMNS
        ))
        .bind(digest)
        .bind(now)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get user by reset token")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn update(&self, user: &User) -> Result<User> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = ?, email = ?, password_hash = ?, role = ?,
                reset_password_token = ?, reset_password_expire = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.reset_password_token)
        .bind(user.reset_password_expire)
        .bind(Utc::now())
        .bind(user.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update user")?;

        self.get_by_id(user.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete user")?;

        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count users")?;

        Ok(row.get("count"))
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        reset_password_token: row.get("reset_password_token"),
        reset_password_expire: row.get("reset_password_expire"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, is_unique_violation, migrations::run_migrations};
    use crate::services::password::hash_password;
    use chrono::Duration;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxUserRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        let repo = SqlxUserRepository::new(pool.clone());
        (pool, repo)
    }

    fn create_test_user(name: &str, email: &str) -> User {
        User::new(
            name.to_string(),
            email.to_string(),
            "$argon2id$placeholder".to_string(),
            UserRole::User,
        )
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&create_test_user("Ada", "ada@example.com"))
            .await
            .expect("Failed to create user");

        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().expect("User not found");
        assert_eq!(by_id.name, "Ada");
        assert_eq!(by_id.role, UserRole::User);

        let by_email = repo.get_by_email("ada@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(created.id));
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let (_pool, repo) = setup_test_repo().await;
        assert!(repo.get_by_id(999).await.unwrap().is_none());
        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_email_constraint() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&create_test_user("One", "dup@example.com"))
            .await
            .expect("Failed to create first user");

        let err = repo
            .create(&create_test_user("Two", "dup@example.com"))
            .await
            .expect_err("Should fail due to duplicate email");
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_update_and_reset_token_lookup() {
        let (_pool, repo) = setup_test_repo().await;
        let mut user = repo
            .create(&create_test_user("Ada", "ada@example.com"))
            .await
            .unwrap();

        let now = Utc::now();
        user.name = "Ada L".to_string();
        user.reset_password_token = Some("abc123".to_string());
        user.reset_password_expire = Some(now + Duration::minutes(10));
        let updated = repo.update(&user).await.unwrap();
        assert_eq!(updated.name, "Ada L");

        let found = repo.get_by_reset_token("abc123", now).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        let expired = repo
            .get_by_reset_token("abc123", now + Duration::minutes(11))
            .await
            .unwrap();
        assert!(expired.is_none());
        assert!(repo.get_by_reset_token("other", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let (_pool, repo) = setup_test_repo().await;
        assert_eq!(repo.count().await.unwrap(), 0);

        let a = repo.create(&create_test_user("A", "a@example.com")).await.unwrap();
        repo.create(&create_test_user("B", "b@example.com")).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);

        repo.delete(a.id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.get_by_id(a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_hash_stored_correctly() {
        let (_pool, repo) = setup_test_repo().await;
        let hash = hash_password("my_secure_password").expect("Failed to hash password");
        let user = User::new(
            "Hash".to_string(),
            "hash@example.com".to_string(),
            hash.clone(),
            UserRole::Admin,
        );

        let created = repo.create(&user).await.unwrap();
        let found = repo.get_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(found.password_hash, hash);
        assert!(found.password_hash.starts_with("$argon2id$"));
        assert_eq!(found.role, UserRole::Admin);
    }
}
