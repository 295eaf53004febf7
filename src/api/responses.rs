//! Shared API response types
//!
//! Every successful response is wrapped as `{"success": true, "data": ...}`;
//! lists add `count`, `total` and a `pagination` block.

use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::api::middleware::ApiError;
use crate::models::{PagedResult, Pagination};

/// Single-value envelope
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

/// List envelope
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub success: bool,
    /// Items in this page
    pub count: usize,
    /// Items across all pages
    pub total: i64,
    pub pagination: Pagination,
    pub data: Vec<T>,
}

impl<T> From<PagedResult<T>> for ListResponse<T> {
    fn from(page: PagedResult<T>) -> Self {
        Self {
            success: true,
            count: page.len(),
            total: page.total,
            pagination: page.pagination(),
            data: page.items,
        }
    }
}

/// Serializes as `{}`
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

pub type ApiResult<T> = Result<Json<DataResponse<T>>, ApiError>;

pub fn ok<T: Serialize>(data: T) -> Json<DataResponse<T>> {
    Json(DataResponse::new(data))
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<DataResponse<T>>) {
    (StatusCode::CREATED, ok(data))
}

/// Body returned by delete endpoints
pub fn deleted() -> Json<DataResponse<Empty>> {
    ok(Empty {})
}

pub fn list<T: Serialize>(page: PagedResult<T>) -> Json<ListResponse<T>> {
    Json(page.into())
}
