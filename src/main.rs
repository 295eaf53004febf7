//! Portfolio API server

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portfolio::{
    api::{self, AppState},
    config::{Config, DEFAULT_JWT_SECRET},
    db::{self, seed},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portfolio=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting portfolio API...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::warn!("Using the built-in JWT secret; set PORTFOLIO_JWT_SECRET before deploying");
    }

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {}", config.database.url);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    if config.database.seed {
        let report = seed::seed_if_empty(&pool).await?;
        if report.is_empty() {
            tracing::info!("Seeding skipped, database already has content");
        }
    }

    if !config.email.is_enabled() {
        tracing::info!("SMTP not configured, password reset links will be logged");
    }

    // Build application state and router
    let state = AppState::new(pool.clone(), &config);
    let app = api::build_router(state, &config.server)?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl+C so in-flight requests can finish before the pool closes
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
