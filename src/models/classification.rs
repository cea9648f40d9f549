//! News classification model
//!
//! Classifications (e.g. "Featured", "Breaking") group news articles and carry
//! a `priority` that drives their default display order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WithArticleCount;

/// Maximum classification name length in characters
pub const CLASSIFICATION_NAME_MAX_LEN: usize = 50;

/// News classification entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsClassification {
    pub id: i64,
    pub name: String,
    /// Display ordering key; listings default to ascending priority
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewsClassification {
    pub fn new(name: String, priority: i32, is_active: bool) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name,
            priority,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

pub type ClassificationWithCount = WithArticleCount<NewsClassification>;

/// Input for creating a classification
#[derive(Debug, Clone)]
pub struct CreateClassificationInput {
    pub name: String,
    /// `None` or `Some(0)` means "append after the current highest priority"
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
}

impl CreateClassificationInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: None,
            is_active: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Priority explicitly requested by the caller.
    ///
    /// Zero counts as unset, matching how the admin UI submits an empty field.
    pub fn explicit_priority(&self) -> Option<i32> {
        self.priority.filter(|p| *p != 0)
    }
}

/// Partial update for a classification
#[derive(Debug, Clone, Default)]
pub struct UpdateClassificationInput {
    pub name: Option<String>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_priority_treats_zero_as_unset() {
        assert_eq!(CreateClassificationInput::new("Featured").explicit_priority(), None);
        assert_eq!(
            CreateClassificationInput::new("Featured")
                .with_priority(0)
                .explicit_priority(),
            None
        );
        assert_eq!(
            CreateClassificationInput::new("Featured")
                .with_priority(7)
                .explicit_priority(),
            Some(7)
        );
    }
}
