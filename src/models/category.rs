//! Category model
//!
//! Every news article belongs to exactly one category (`news.category_id`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WithArticleCount;

/// Maximum category name length in characters
pub const CATEGORY_NAME_MAX_LEN: usize = 100;

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// Unique display name
    pub name: String,
    /// Optional free-text description
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Create a new Category; the ID is assigned by the database.
    pub fn new(name: String, description: Option<String>, is_active: bool) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name,
            description,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Category with the number of news articles filed under it
pub type CategoryWithCount = WithArticleCount<Category>;

/// Input for creating a category
#[derive(Debug, Clone)]
pub struct CreateCategoryInput {
    pub name: String,
    pub description: Option<String>,
    /// Defaults to `true`
    pub is_active: Option<bool>,
}

impl CreateCategoryInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            is_active: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update for a category
#[derive(Debug, Clone, Default)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_new() {
        let category = Category::new(
            "Press Releases".to_string(),
            Some("Official statements".to_string()),
            true,
        );

        assert_eq!(category.id, 0);
        assert_eq!(category.name, "Press Releases");
        assert_eq!(category.description.as_deref(), Some("Official statements"));
        assert!(category.is_active);
    }

    #[test]
    fn test_create_input_builder() {
        let input = CreateCategoryInput::new("Results").with_description("Competition results");

        assert_eq!(input.name, "Results");
        assert_eq!(input.description.as_deref(), Some("Competition results"));
        assert!(input.is_active.is_none());
    }
}
