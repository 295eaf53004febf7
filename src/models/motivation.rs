//! Motivation model
//!
//! Quotes, images and videos shown on the motivation wall.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Motivation {
    pub id: i64,
    /// Serialized as `type` to match what the frontend reads
    #[serde(rename = "type")]
    pub kind: MotivationKind,
    /// Quote text, or caption for media
    pub content: String,
    pub author: Option<String>,
    pub media_url: Option<String>,
    pub tags: Vec<String>,
    pub likes: i64,
    pub views: i64,
    pub shares: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotivationKind {
    #[default]
    Quote,
    Image,
    Video,
}

impl MotivationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MotivationKind::Quote => "quote",
            MotivationKind::Image => "image",
            MotivationKind::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quote" => Some(MotivationKind::Quote),
            "image" => Some(MotivationKind::Image),
            "video" => Some(MotivationKind::Video),
            _ => None,
        }
    }

    /// Image and video entries point at a media file
    pub fn needs_media(&self) -> bool {
        matches!(self, MotivationKind::Image | MotivationKind::Video)
    }
}

impl std::fmt::Display for MotivationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMotivationInput {
    #[serde(rename = "type", alias = "kind")]
    pub kind: Option<MotivationKind>,
    #[serde(default)]
    pub content: String,
    pub author: Option<String>,
    pub media_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMotivationInput {
    #[serde(rename = "type", alias = "kind")]
    pub kind: Option<MotivationKind>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub media_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Filters accepted by the motivation list
#[derive(Debug, Clone, Default)]
pub struct MotivationFilter {
    pub search: Option<String>,
    pub kind: Option<MotivationKind>,
    pub tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(MotivationKind::parse("Quote"), Some(MotivationKind::Quote));
        assert_eq!(MotivationKind::parse("video"), Some(MotivationKind::Video));
        assert_eq!(MotivationKind::parse("gif"), None);
        assert!(MotivationKind::Image.needs_media());
        assert!(!MotivationKind::Quote.needs_media());
    }

    #[test]
    fn test_input_accepts_type_or_kind() {
        let a: CreateMotivationInput =
            serde_json::from_value(serde_json::json!({"type": "image"})).unwrap();
        let b: CreateMotivationInput =
            serde_json::from_value(serde_json::json!({"kind": "video"})).unwrap();

        assert_eq!(a.kind, Some(MotivationKind::Image));
        assert_eq!(b.kind, Some(MotivationKind::Video));
    }
}
