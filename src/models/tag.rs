//! Tag model
//!
//! Tags are free-form labels attached to news articles through the
//! `news_tag_links` join table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WithArticleCount;

/// Maximum tag name length in characters
pub const TAG_NAME_MAX_LEN: usize = 50;

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Unique display name
    pub name: String,
    /// Whether the tag is offered to editors and shown on the site
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    /// Create a new Tag; the ID is assigned by the database.
    pub fn new(name: String, is_active: bool) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Tag with the number of news articles carrying it
pub type TagWithCount = WithArticleCount<Tag>;

/// Input for creating a tag
#[derive(Debug, Clone)]
pub struct CreateTagInput {
    pub name: String,
    /// Defaults to `true`
    pub is_active: Option<bool>,
}

impl CreateTagInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_active: None,
        }
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }
}

/// Partial update for a tag
#[derive(Debug, Clone, Default)]
pub struct UpdateTagInput {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_new() {
        let tag = Tag::new("Wheelchair Rugby".to_string(), true);

        assert_eq!(tag.id, 0);
        assert_eq!(tag.name, "Wheelchair Rugby");
        assert!(tag.is_active);
        assert_eq!(tag.created_at, tag.updated_at);
    }

    #[test]
    fn test_tag_with_count_serializes_flat_camel_case() {
        let tag = Tag::new("Boccia".to_string(), false);
        let json = serde_json::to_value(TagWithCount::new(tag, 3)).unwrap();

        assert_eq!(json["name"], "Boccia");
        assert_eq!(json["isActive"], false);
        assert_eq!(json["articleCount"], 3);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("item").is_none());
    }
}
