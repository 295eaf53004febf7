//! Upload API endpoints
//!
//! - POST /api/upload - Store one image (admin), served back under /uploads

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    middleware as axum_middleware,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use crate::api::middleware::{self, ApiError, AppState};
use crate::api::responses::{created, DataResponse};
use crate::config::UploadConfig;

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Stored file details
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

pub fn router(state: AppState) -> Router<AppState> {
    let body_limit = usize::try_from(state.upload_config.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", post(upload_file))
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(state, middleware::require_auth))
        .layer(DefaultBodyLimit::max(body_limit))
}

fn too_large(config: &UploadConfig) -> ApiError {
    ApiError::bad_request(format!(
        "Please upload an image less than {} bytes",
        config.max_file_size
    ))
}

fn multipart_error(err: MultipartError, config: &UploadConfig) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return too_large(config);
    }
    ApiError::bad_request(format!("Invalid upload: {}", err))
}

/// Accepts multipart/form-data with a single field named "file".
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DataResponse<UploadResponse>>), ApiError> {
    let config = &state.upload_config;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, config))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        if !config.is_type_allowed(&content_type) {
            return Err(ApiError::bad_request("Please upload an image file"));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, config))?;

        if data.len() as u64 > config.max_file_size {
            return Err(too_large(config));
        }

        fs::create_dir_all(&config.path)
            .await
            .map_err(ApiError::internal_error)?;

        let filename = format!("{}.{}", Uuid::new_v4(), extension_for(&original, &content_type));
        fs::write(config.path.join(&filename), &data)
            .await
            .map_err(ApiError::internal_error)?;

        tracing::info!("Stored upload {} ({} bytes)", filename, data.len());

        return Ok(created(UploadResponse {
            url: format!("/uploads/{}", filename),
            filename,
            size: data.len() as u64,
            content_type,
        }));
    }

    Err(ApiError::bad_request("Please upload a file"))
}

/// Pick the stored file extension, preferring the MIME type
fn extension_for(original: &str, content_type: &str) -> String {
    let from_mime = match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    };
    if let Some(ext) = from_mime {
        return ext.to_string();
    }

    Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}
