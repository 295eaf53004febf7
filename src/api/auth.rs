//! Authentication API endpoints
//!
//! Handles HTTP requests for user authentication:
//! - POST /api/auth/register - Register (first account becomes admin)
//! - POST /api/auth/login - Log in
//! - GET|POST /api/auth/logout - Clear the auth cookie
//! - GET /api/auth/me - Current user
//! - PUT /api/auth/updateprofile - Change name or email
//! - PUT /api/auth/updatepassword - Change password
//! - POST /api/auth/forgotpassword - Mail a reset link
//! - PUT /api/auth/resetpassword/{token} - Set a new password from a reset link
//!
//! Successful sign-ins answer with the token in the body and as an
//! HttpOnly cookie.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{ApiJson, ApiPath};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, TOKEN_COOKIE};
use crate::api::responses::{ok, ApiResult, Empty};
use crate::config::AuthConfig;
use crate::models::{CreateUserInput, UpdateProfileInput, User};
use crate::services::AuthSession;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Lifetime of the cookie that replaces the token on logout
const LOGOUT_COOKIE_SECONDS: i64 = 10;

/// Request body for login
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for changing password
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    pub user: User,
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/updateprofile", put(update_profile))
        .route("/updatepassword", put(update_password))
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout).post(logout))
        .route("/forgotpassword", post(forgot_password))
        .route("/resetpassword/{token}", put(reset_password))
}

/// `Set-Cookie` value carrying a freshly issued token
pub fn token_cookie(token: &str, config: &AuthConfig) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        TOKEN_COOKIE,
        token,
        config.cookie_expire_days.max(0) * SECONDS_PER_DAY
    );
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

fn logout_cookie(config: &AuthConfig) -> String {
    let mut cookie = format!(
        "{}=none; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        TOKEN_COOKIE, LOGOUT_COOKIE_SECONDS
    );
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cookie_headers(cookie: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(cookie).map_err(ApiError::internal_error)?,
    );
    Ok(headers)
}

/// Token in body and cookie
fn token_response(state: &AppState, status: StatusCode, session: AuthSession) -> Result<Response, ApiError> {
    let headers = cookie_headers(&token_cookie(&session.token, &state.auth_config))?;
    Ok((
        status,
        headers,
        Json(TokenResponse {
            success: true,
            token: session.token,
            user: session.user,
        }),
    )
        .into_response())
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateUserInput>,
) -> Result<Response, ApiError> {
    let session = state.auth_service.register(body).await?;
    token_response(&state, StatusCode::CREATED, session)
}

/// POST /api/auth/login
async fn login(State(state): State<AppState>, ApiJson(body): ApiJson<LoginRequest>) -> Result<Response, ApiError> {
    let session = state.auth_service.login(&body.email, &body.password).await?;
    token_response(&state, StatusCode::OK, session)
}

/// GET|POST /api/auth/logout
///
/// Public so a stale cookie can always be cleared.
async fn logout(State(state): State<AppState>) -> Result<Response, ApiError> {
    let headers = cookie_headers(&logout_cookie(&state.auth_config))?;
    Ok((headers, ok(Empty {})).into_response())
}

/// GET /api/auth/me
async fn get_me(user: AuthenticatedUser) -> ApiResult<User> {
    Ok(ok(user.0))
}

/// PUT /api/auth/updateprofile
async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<UpdateProfileInput>,
) -> ApiResult<User> {
    let updated = state.auth_service.update_profile(user.0.id, body).await?;
    Ok(ok(updated))
}

/// PUT /api/auth/updatepassword
async fn update_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<UpdatePasswordRequest>,
) -> Result<Response, ApiError> {
    let session = state
        .auth_service
        .update_password(user.0.id, &body.current_password, &body.new_password)
        .await?;
    token_response(&state, StatusCode::OK, session)
}

/// POST /api/auth/forgotpassword
async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<&'static str> {
    state.auth_service.forgot_password(&body.email).await?;
    Ok(ok("Email sent"))
}

/// PUT /api/auth/resetpassword/{token}
async fn reset_password(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    let session = state.auth_service.reset_password(&token, &body.password).await?;
    token_response(&state, StatusCode::OK, session)
}
