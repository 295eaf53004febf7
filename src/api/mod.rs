//! API layer - HTTP handlers and routing
//!
//! Every endpoint lives under `/api` and answers with the
//! `{success, data}` / `{success: false, message}` envelope:
//! - Auth endpoints (`/api/auth`)
//! - Projects, blogs, motivations, build-in-public entries and tasks
//! - Image upload and health

pub mod auth;
pub mod blogs;
pub mod build_in_public;
pub mod common;
pub mod middleware;
pub mod motivations;
pub mod projects;
pub mod responses;
pub mod site;
pub mod tasks;
pub mod upload;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::ServerConfig;

pub use middleware::{ApiError, AppState};

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let auth_routes = auth::public_router().merge(
        auth::protected_router()
            .route_layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth)),
    );

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/projects", projects::router(state.clone()))
        .nest("/blogs", blogs::router(state.clone()))
        .nest("/motivations", motivations::router(state.clone()))
        .nest("/build-in-public", build_in_public::router(state.clone()))
        .nest("/tasks", tasks::router(state.clone()))
        .nest("/upload", upload::router(state))
        .merge(site::router())
}

/// Build the complete application with CORS, tracing and `/uploads` serving
pub fn build_router(state: AppState, server: &ServerConfig) -> anyhow::Result<Router> {
    let origin = server
        .cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", server.cors_origin))?;

    // Credentials require an explicit origin, never a wildcard
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    let uploads = ServeDir::new(&state.upload_config.path);

    Ok(Router::new()
        .nest("/api", build_api_router(state.clone()))
        .nest_service("/uploads", uploads)
        .fallback(route_not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
