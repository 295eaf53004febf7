//! Configuration management
//!
//! Configuration is loaded from `config.yml` and then overridden by
//! `PORTFOLIO_*` environment variables. Missing values fall back to defaults
//! suitable for local development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Secret used when nothing else is configured. `main` warns when it is still in use.
pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Token and cookie configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// Outgoing mail configuration (password reset)
    #[serde(default)]
    pub email: EmailConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (cookies are sent cross-origin, so this must be explicit)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or URL (`:memory:` for an in-memory database)
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Insert demo content when the database is empty
    #[serde(default)]
    pub seed: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            seed: false,
        }
    }
}

fn default_database_url() -> String {
    "data/portfolio.db".to_string()
}

/// Token and cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Token lifetime in days
    #[serde(default = "default_expire_days")]
    pub jwt_expire_days: i64,
    /// Cookie lifetime in days
    #[serde(default = "default_expire_days")]
    pub cookie_expire_days: i64,
    /// Add the `Secure` attribute to the auth cookie
    #[serde(default)]
    pub secure_cookie: bool,
    /// Lifetime of a password reset token in minutes
    #[serde(default = "default_reset_token_expire_minutes")]
    pub reset_token_expire_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_expire_days: default_expire_days(),
            cookie_expire_days: default_expire_days(),
            secure_cookie: false,
            reset_token_expire_minutes: default_reset_token_expire_minutes(),
        }
    }
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_expire_days() -> i64 {
    30
}

fn default_reset_token_expire_minutes() -> i64 {
    10
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 5MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
        "image/svg+xml".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }
}

/// Outgoing mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host; empty disables delivery and reset links are logged instead
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: String,
    #[serde(default)]
    pub smtp_password: String,
    /// Sender address, e.g. `Portfolio <noreply@example.com>`
    #[serde(default = "default_from")]
    pub from: String,
    /// Public base URL used to build reset links
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from: default_from(),
            public_url: default_public_url(),
        }
    }
}

impl EmailConfig {
    /// Whether an SMTP relay is configured
    pub fn is_enabled(&self) -> bool {
        !self.smtp_host.trim().is_empty()
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from() -> String {
    "Portfolio <noreply@localhost>".to_string()
}

fn default_public_url() -> String {
    "http://localhost:5000".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration. Invalid YAML
    /// is an error carrying the line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        Ok(config)
    }

    /// Load configuration from file, then apply environment overrides
    ///
    /// Recognized variables:
    /// - PORTFOLIO_SERVER_HOST, PORTFOLIO_SERVER_PORT, PORTFOLIO_CORS_ORIGIN
    /// - PORTFOLIO_DATABASE_URL, PORTFOLIO_DATABASE_SEED
    /// - PORTFOLIO_JWT_SECRET, PORTFOLIO_JWT_EXPIRE_DAYS, PORTFOLIO_COOKIE_EXPIRE_DAYS,
    ///   PORTFOLIO_SECURE_COOKIE
    /// - PORTFOLIO_UPLOAD_PATH
    /// - PORTFOLIO_SMTP_HOST, PORTFOLIO_SMTP_PORT, PORTFOLIO_SMTP_USERNAME,
    ///   PORTFOLIO_SMTP_PASSWORD, PORTFOLIO_EMAIL_FROM, PORTFOLIO_PUBLIC_URL
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("PORTFOLIO_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parsed::<u16>("PORTFOLIO_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(origin) = std::env::var("PORTFOLIO_CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }

        if let Ok(url) = std::env::var("PORTFOLIO_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(seed) = env_parsed::<bool>("PORTFOLIO_DATABASE_SEED") {
            self.database.seed = seed;
        }

        if let Ok(secret) = std::env::var("PORTFOLIO_JWT_SECRET") {
            if !secret.is_empty() {
                self.auth.jwt_secret = secret;
            }
        }
        if let Some(days) = env_parsed::<i64>("PORTFOLIO_JWT_EXPIRE_DAYS") {
            self.auth.jwt_expire_days = days;
        }
        if let Some(days) = env_parsed::<i64>("PORTFOLIO_COOKIE_EXPIRE_DAYS") {
            self.auth.cookie_expire_days = days;
        }
        if let Some(secure) = env_parsed::<bool>("PORTFOLIO_SECURE_COOKIE") {
            self.auth.secure_cookie = secure;
        }

        if let Ok(path) = std::env::var("PORTFOLIO_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }

        if let Ok(host) = std::env::var("PORTFOLIO_SMTP_HOST") {
            self.email.smtp_host = host;
        }
        if let Some(port) = env_parsed::<u16>("PORTFOLIO_SMTP_PORT") {
            self.email.smtp_port = port;
        }
        if let Ok(username) = std::env::var("PORTFOLIO_SMTP_USERNAME") {
            self.email.smtp_username = username;
        }
        if let Ok(password) = std::env::var("PORTFOLIO_SMTP_PASSWORD") {
            self.email.smtp_password = password;
        }
        if let Ok(from) = std::env::var("PORTFOLIO_EMAIL_FROM") {
            self.email.from = from;
        }
        if let Ok(url) = std::env::var("PORTFOLIO_PUBLIC_URL") {
            self.email.public_url = url;
        }
    }
}

/// Read and parse an environment variable, ignoring unparsable values
fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches PORTFOLIO_* variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "PORTFOLIO_SERVER_HOST",
    "PORTFOLIO_SERVER_PORT",
    "PORTFOLIO_CORS_ORIGIN",
    "PORTFOLIO_DATABASE_URL",
    "PORTFOLIO_DATABASE_SEED",
    "PORTFOLIO_JWT_SECRET",
    "PORTFOLIO_JWT_EXPIRE_DAYS",
    "PORTFOLIO_COOKIE_EXPIRE_DAYS",
    "PORTFOLIO_SECURE_COOKIE",
    "PORTFOLIO_UPLOAD_PATH",
    "PORTFOLIO_SMTP_HOST",
    "PORTFOLIO_SMTP_PORT",
    "PORTFOLIO_SMTP_USERNAME",
    "PORTFOLIO_SMTP_PASSWORD",
    "PORTFOLIO_EMAIL_FROM",
    "PORTFOLIO_PUBLIC_URL",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_portfolio_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.url, "data/portfolio.db");
        assert!(!config.database.seed);
        assert_eq!(config.auth.jwt_secret, DEFAULT_JWT_SECRET);
        assert_eq!(config.auth.jwt_expire_days, 30);
        assert_eq!(config.auth.reset_token_expire_minutes, 10);
        assert!(!config.email.is_enabled());
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "   \n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "auth:\n  jwt_secret: \"s3cret\"\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.jwt_expire_days, 30);
        assert_eq!(config.auth.cookie_expire_days, 30);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9000
  cors_origin: "https://me.dev"
database:
  url: ":memory:"
  seed: true
auth:
  jwt_secret: "abc"
  jwt_expire_days: 7
  cookie_expire_days: 7
  secure_cookie: true
  reset_token_expire_minutes: 15
upload:
  path: "media"
  max_file_size: 1024
email:
  smtp_host: "smtp.example.com"
  smtp_port: 465
  public_url: "https://me.dev"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.cors_origin, "https://me.dev");
        assert_eq!(config.database.url, ":memory:");
        assert!(config.database.seed);
        assert_eq!(config.auth.jwt_secret, "abc");
        assert_eq!(config.auth.jwt_expire_days, 7);
        assert!(config.auth.secure_cookie);
        assert_eq!(config.auth.reset_token_expire_minutes, 15);
        assert_eq!(config.upload.path, PathBuf::from("media"));
        assert_eq!(config.upload.max_file_size, 1024);
        assert!(config.email.is_enabled());
        assert_eq!(config.email.smtp_port, 465);
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_malformed_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  host: [invalid yaml").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_upload_type_allowed() {
        let config = UploadConfig::default();
        assert!(config.is_type_allowed("image/png"));
        assert!(!config.is_type_allowed("application/pdf"));
    }

    #[test]
    fn test_env_override_server_and_auth() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("PORTFOLIO_SERVER_PORT", "4000");
        std::env::set_var("PORTFOLIO_JWT_SECRET", "from-env");
        std::env::set_var("PORTFOLIO_JWT_EXPIRE_DAYS", "3");
        std::env::set_var("PORTFOLIO_SECURE_COOKIE", "true");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.auth.jwt_secret, "from-env");
        assert_eq!(config.auth.jwt_expire_days, 3);
        assert!(config.auth.secure_cookie);

        clear_env();
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("PORTFOLIO_SERVER_PORT", "not_a_number");
        std::env::set_var("PORTFOLIO_JWT_EXPIRE_DAYS", "soon");
        std::env::set_var("PORTFOLIO_JWT_SECRET", "");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.jwt_expire_days, 30);
        assert_eq!(config.auth.jwt_secret, DEFAULT_JWT_SECRET);

        clear_env();
    }

    #[test]
    fn test_env_override_email() {
        let _guard = lock_env();
        clear_env();

        let file = NamedTempFile::new().unwrap();
        std::env::set_var("PORTFOLIO_SMTP_HOST", "mail.example.com");
        std::env::set_var("PORTFOLIO_SMTP_PORT", "2525");
        std::env::set_var("PORTFOLIO_PUBLIC_URL", "https://site.example.com");

        let config = Config::load_with_env(file.path()).unwrap();

        assert!(config.email.is_enabled());
        assert_eq!(config.email.smtp_port, 2525);
        assert_eq!(config.email.public_url, "https://site.example.com");

        clear_env();
    }
}

/// Property-based tests for configuration parsing
#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn auth_strategy() -> impl Strategy<Value = AuthConfig> {
        (
            "[a-zA-Z0-9]{8,32}",
            1i64..365,
            1i64..365,
            any::<bool>(),
            1i64..120,
        )
            .prop_map(|(jwt_secret, jwt_expire_days, cookie_expire_days, secure_cookie, reset)| {
                AuthConfig {
                    jwt_secret,
                    jwt_expire_days,
                    cookie_expire_days,
                    secure_cookie,
                    reset_token_expire_minutes: reset,
                }
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]

        #[test]
        fn config_yaml_roundtrip(auth in auth_strategy(), port in 1u16..=65535, seed in any::<bool>()) {
            let mut config = Config::default();
            config.auth = auth;
            config.server.port = port;
            config.database.seed = seed;

            let yaml = serde_yaml::to_string(&config).unwrap();
            let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

            prop_assert_eq!(parsed.server.port, port);
            prop_assert_eq!(parsed.database.seed, seed);
            prop_assert_eq!(parsed.auth.jwt_secret, config.auth.jwt_secret);
            prop_assert_eq!(parsed.auth.jwt_expire_days, config.auth.jwt_expire_days);
            prop_assert_eq!(parsed.auth.secure_cookie, config.auth.secure_cookie);
        }

        #[test]
        fn missing_sections_are_defaulted(port in 1u16..=65535) {
            let yaml = format!("server:\n  port: {}\n", port);
            let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

            prop_assert_eq!(parsed.server.port, port);
            prop_assert_eq!(parsed.database.url, "data/portfolio.db");
            prop_assert_eq!(parsed.auth.reset_token_expire_minutes, 10);
        }
    }
}
