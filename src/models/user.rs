//! User model
//!
//! Accounts that can sign in. The role decides whether a user may write
//! portfolio content (`admin`) or only manage their own tasks and comments
//! (`user`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Email address (unique, stored lowercased)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// User role
    pub role: UserRole,
    /// SHA-256 hex digest of the outstanding password-reset token
    #[serde(skip_serializing, default)]
    pub reset_password_token: Option<String>,
    /// When the outstanding reset token stops being accepted
    #[serde(skip_serializing, default)]
    pub reset_password_expire: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The password must already be hashed with
    /// `services::password::hash_password()`.
    pub fn new(name: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            name,
            email,
            password_hash,
            role,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins may act on anything; everyone else only on what they own.
    pub fn can_manage(&self, owner_id: i64) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular account
    #[default]
    User,
    /// Full access to portfolio content
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Plaintext password (will be hashed)
    #[serde(default)]
    pub password: String,
}

/// Profile fields a user may change about themselves
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UpdateProfileInput {
    pub fn has_changes(&self) -> bool {
        self.name.is_some() || self.email.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, role: UserRole) -> User {
        let mut user = User::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            "hash".to_string(),
            role,
        );
        user.id = id;
        user
    }

    #[test]
    fn test_user_new() {
        let user = User::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            "hashed_password".to_string(),
            UserRole::User,
        );

        assert_eq!(user.id, 0);
        assert_eq!(user.name, "Ada");
        assert!(user.reset_password_token.is_none());
        assert!(!user.is_admin());
    }

    #[test]
    fn test_can_manage() {
        let admin = user(1, UserRole::Admin);
        let regular = user(2, UserRole::User);

        assert!(admin.can_manage(2));
        assert!(admin.can_manage(999));
        assert!(regular.can_manage(2));
        assert!(!regular.can_manage(1));
    }

    #[test]
    fn test_secrets_are_never_serialized() {
        let mut user = user(1, UserRole::User);
        user.reset_password_token = Some("digest".to_string());
        user.reset_password_expire = Some(Utc::now());

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("resetPasswordToken").is_none());
        assert!(json.get("resetPasswordExpire").is_none());
        assert_eq!(json["role"], "user");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!(UserRole::from_str("admin").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::from_str("USER").unwrap(), UserRole::User);
        assert!(UserRole::from_str("editor").is_err());
        assert_eq!(UserRole::default(), UserRole::User);
    }
}
