//! Common API utilities and shared types
//!
//! Extractors that turn axum's plain-text rejections into the JSON error
//! envelope, and the query parameters shared by every list endpoint.

use axum::{
    extract::{FromRequest, FromRequestParts, Json, Path, Query, RawPathParams, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::middleware::ApiError;
use crate::models::{ListParams, DEFAULT_PER_PAGE};

/// `Path` extractor; an unparsable id becomes
/// 404 "Resource not found with id of X"
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => {
                tracing::debug!("Path rejected: {}", rejection.body_text());
                let raw = RawPathParams::from_request_parts(parts, state)
                    .await
                    .ok()
                    .and_then(|params| {
                        params
                            .iter()
                            .map(|(_, value)| value.to_string())
                            .find(|value| value.parse::<i64>().is_err())
                    })
                    .unwrap_or_default();
                Err(ApiError::not_found(format!("Resource not found with id of {}", raw)))
            }
        }
    }
}

/// `Json` extractor reporting malformed bodies as 400 in the envelope
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

/// `Query` extractor reporting malformed query strings as 400 in the envelope
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

// ============================================================================
// List query parameters
// ============================================================================

/// Query string accepted by every list endpoint.
///
/// Everything arrives as text so a stray value never rejects the whole
/// request: bad numbers fall back to defaults, unknown flags are ignored.
/// Enum filters and sort fields are checked strictly.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub featured: Option<String>,
    pub technology: Option<String>,
    pub tag: Option<String>,
    pub kind: Option<String>,
    #[serde(rename = "type")]
    pub type_alias: Option<String>,
    pub priority: Option<String>,
}

impl ListQuery {
    pub fn params(&self) -> ListParams {
        let page = parse_number(self.page.as_deref()).unwrap_or(1);
        let limit = parse_number(self.limit.as_deref()).unwrap_or(DEFAULT_PER_PAGE);
        ListParams::new(page, limit)
    }

    pub fn sort(&self) -> Option<&str> {
        self.sort.as_deref()
    }

    pub fn featured(&self) -> Option<bool> {
        parse_flag(self.featured.as_deref())
    }

    /// `kind`, falling back to its `type` alias
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref().or(self.type_alias.as_deref())
    }
}

fn parse_number(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
}

/// `true`/`1`/`yes` and `false`/`0`/`no`, anything else is no filter
pub fn parse_flag(raw: Option<&str>) -> Option<bool> {
    match raw?.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parse an enum filter; unknown values are a 400
pub fn parse_enum<E>(raw: Option<&str>, name: &str, parse: fn(&str) -> Option<E>) -> Result<Option<E>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => parse(value)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid {}: {}", name, value))),
    }
}
