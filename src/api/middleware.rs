//! API middleware
//!
//! Contains:
//! - Application state shared by every handler
//! - The JSON error envelope
//! - Authentication (JWT from bearer header or cookie)
//! - Authorization (admin role check)

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::{AuthConfig, Config, UploadConfig};
use crate::db::repositories::{
    SqlxBlogRepository, SqlxBuildInPublicRepository, SqlxMotivationRepository, SqlxProjectRepository,
    SqlxTaskRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    AuthService, AuthServiceError, BlogService, BuildInPublicService, ContentServiceError, EmailService,
    MarkdownRenderer, MotivationService, ProjectService, TaskService, TokenService,
};

/// Name of the cookie carrying the JWT
pub const TOKEN_COOKIE: &str = "token";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub auth_service: Arc<AuthService>,
    pub blog_service: Arc<BlogService>,
    pub project_service: Arc<ProjectService>,
    pub build_in_public_service: Arc<BuildInPublicService>,
    pub motivation_service: Arc<MotivationService>,
    pub task_service: Arc<TaskService>,
    pub auth_config: Arc<AuthConfig>,
    pub upload_config: Arc<UploadConfig>,
}

impl AppState {
    /// Wire repositories and services from configuration
    pub fn new(pool: DynDatabasePool, config: &Config) -> Self {
        Self::with_email(pool, config, EmailService::from_config(&config.email))
    }

    /// Same as [`AppState::new`] with a caller-supplied email service
    pub fn with_email(pool: DynDatabasePool, config: &Config, email: EmailService) -> Self {
        let auth_service = AuthService::new(
            SqlxUserRepository::boxed(pool.clone()),
            TokenService::from_config(&config.auth),
            email,
            config.auth.reset_token_expire_minutes,
        );

        Self {
            auth_service: Arc::new(auth_service),
            blog_service: Arc::new(BlogService::new(
                SqlxBlogRepository::boxed(pool.clone()),
                MarkdownRenderer::new(),
            )),
            project_service: Arc::new(ProjectService::new(SqlxProjectRepository::boxed(pool.clone()))),
            build_in_public_service: Arc::new(BuildInPublicService::new(SqlxBuildInPublicRepository::boxed(
                pool.clone(),
            ))),
            motivation_service: Arc::new(MotivationService::new(SqlxMotivationRepository::boxed(pool.clone()))),
            task_service: Arc::new(TaskService::new(SqlxTaskRepository::boxed(pool.clone()))),
            auth_config: Arc::new(config.auth.clone()),
            upload_config: Arc::new(config.upload.clone()),
            pool,
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Not authorized to access this route"))
    }
}

/// User attached by [`optional_auth`], if any
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(User::is_admin)
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<AuthenticatedUser>().map(|u| u.0.clone())))
    }
}

/// Error response for API errors, rendered as `{"success": false, "message": ...}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Logs the cause; the client only sees a generic message
    pub fn internal_error(cause: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", cause);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Server Error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::Validation(msg) | AuthServiceError::Duplicate(msg) => ApiError::bad_request(msg),
            AuthServiceError::Unauthorized(msg) => ApiError::unauthorized(msg),
            AuthServiceError::NotFound(msg) => ApiError::not_found(msg),
            AuthServiceError::EmailFailed => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, AuthServiceError::EmailFailed.to_string())
            }
            AuthServiceError::Internal(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<ContentServiceError> for ApiError {
    fn from(err: ContentServiceError) -> Self {
        match err {
            ContentServiceError::Validation(msg) | ContentServiceError::Duplicate(msg) => ApiError::bad_request(msg),
            ContentServiceError::NotFound(msg) => ApiError::not_found(msg),
            ContentServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ContentServiceError::Internal(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

/// Extract the JWT: bearer header first, then the `token` cookie.
///
/// The logout cookie value `none` counts as no token.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    for cookie_header in headers.get_all(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie.trim().strip_prefix("token=") {
                    if !token.is_empty() && token != "none" {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Not authorized to access this route"))?;

    let user = state.auth_service.authenticate(&token).await?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware
///
/// Attaches the user when a valid token is present and carries on either way.
pub async fn optional_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(token) = extract_token(request.headers()) {
        match state.auth_service.authenticate(&token).await {
            Ok(user) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Err(e) => tracing::debug!("Ignoring invalid token: {}", e),
        }
    }
    next.run(request).await
}

/// Admin authorization middleware; runs after [`require_auth`]
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Not authorized to access this route"))?;

    if !user.0.is_admin() {
        return Err(ApiError::forbidden(format!(
            "User role {} is not authorized to access this route",
            user.0.role
        )));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_extract_token_from_bearer() {
        let map = headers(&[(header::AUTHORIZATION, "Bearer abc.def.ghi")]);
        assert_eq!(extract_token(&map), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let map = headers(&[(header::COOKIE, "theme=dark; token=cookie-token")]);
        assert_eq!(extract_token(&map), Some("cookie-token".to_string()));
    }

    #[test]
    fn test_extract_token_bearer_priority() {
        let map = headers(&[
            (header::AUTHORIZATION, "Bearer bearer-token"),
            (header::COOKIE, "token=cookie-token"),
        ]);
        assert_eq!(extract_token(&map), Some("bearer-token".to_string()));
    }

    #[test]
    fn test_logged_out_cookie_is_absent() {
        let map = headers(&[(header::COOKIE, "token=none")]);
        assert!(extract_token(&map).is_none());
    }

    #[test]
    fn test_extract_token_invalid_scheme() {
        let map = headers(&[(header::AUTHORIZATION, "Basic invalid")]);
        assert!(extract_token(&map).is_none());
        assert!(extract_token(&HeaderMap::new()).is_none());
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let response = ApiError::not_found("Blog not found with id of 3").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "message": "Blog not found with id of 3"}));
    }

    #[test]
    fn test_service_error_mapping() {
        let err: ApiError = ContentServiceError::Duplicate("Duplicate field value entered".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: ApiError = ContentServiceError::Forbidden("no".into()).into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let err: ApiError = AuthServiceError::EmailFailed.into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Email could not be sent");

        let err: ApiError = AuthServiceError::Internal(anyhow::anyhow!("db gone")).into();
        assert_eq!(err.message, "Server Error");
    }
}
