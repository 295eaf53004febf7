//! Shared pieces of the content services
//!
//! Error type and input normalisation used by the blog, project,
//! build-in-public, motivation and task services.

use crate::db::is_unique_violation;
use crate::db::query::{self, SortField, SortSpec};

/// Error types for content operations
#[derive(Debug, thiserror::Error)]
pub enum ContentServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Duplicate(String),

    /// Authenticated but not allowed to touch this record
    #[error("{0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ContentServiceError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        ContentServiceError::NotFound(format!("{} not found with id of {}", entity, id))
    }
}

impl From<query::SortError> for ContentServiceError {
    fn from(err: query::SortError) -> Self {
        ContentServiceError::Validation(err.to_string())
    }
}

/// Turn a repository write failure into a domain error
pub fn write_error(err: anyhow::Error) -> ContentServiceError {
    if is_unique_violation(&err) {
        ContentServiceError::Duplicate("Duplicate field value entered".to_string())
    } else {
        ContentServiceError::Internal(err)
    }
}

/// Parse a client `sort` parameter against a whitelist
pub fn parse_sort(raw: Option<&str>, allowed: &[SortSpec]) -> Result<Vec<SortField>, ContentServiceError> {
    Ok(query::parse_sort(raw, allowed)?)
}

/// Trimmed, non-empty text or a validation error with `message`
pub fn require_text(value: &str, message: &str) -> Result<String, ContentServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ContentServiceError::Validation(message.to_string()));
    }
    Ok(value.to_string())
}

/// Trimmed text; blank becomes `None`
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Apply a partial update to an optional field. Sending an empty string
/// clears it.
pub fn patch_optional(field: &mut Option<String>, update: Option<String>) {
    if let Some(value) = update {
        *field = optional_text(Some(value));
    }
}

/// Apply a partial update to a required field
pub fn patch_required(field: &mut String, update: Option<String>, message: &str) -> Result<(), ContentServiceError> {
    if let Some(value) = update {
        *field = require_text(&value, message)?;
    }
    Ok(())
}

/// Trim entries, drop blanks and duplicates, keep first-seen order
pub fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}
