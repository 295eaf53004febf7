//! Database layer
//!
//! The portfolio backend stores everything in an embedded SQLite database.
//! Repositories hold a `DynDatabasePool` and never open connections
//! themselves.
//!
//! # Usage
//!
//! ```ignore
//! use portfolio::config::DatabaseConfig;
//! use portfolio::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod query;
pub mod repositories;
pub mod seed;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool, SqliteDatabase};

/// True when an error chain bottoms out in a SQLite UNIQUE violation
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation() || db.message().contains("UNIQUE constraint failed"))
            .unwrap_or(false)
    })
}
