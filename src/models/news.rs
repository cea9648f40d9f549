//! News article model
//!
//! This module provides:
//! - `News` entity and its `NewsStatus`
//! - `NewsDetail`, the article with its category, tags and classifications
//! - Input types for creating and updating articles
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::filter::contains_pattern;

/// Maximum title and slug length in characters
pub const NEWS_TITLE_MAX_LEN: usize = 255;

/// Reading speed used to estimate `read_time`
pub const WORDS_PER_MINUTE: usize = 200;

/// News article entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct News {
    pub id: i64,
    pub title: String,
    /// URL-friendly unique slug
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    /// Public path of the main image (`/uploads/...`)
    pub featured_image: Option<String>,
    /// Public paths of gallery images
    #[serde(default)]
    pub other_images: Vec<String>,
    pub category_id: i64,
    pub status: NewsStatus,
    #[serde(default)]
    pub view_count: i64,
    /// Estimated reading time in minutes
    pub read_time: Option<i32>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    /// Set the first time the article is published
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl News {
    /// Every image path the article references
    pub fn image_paths(&self) -> Vec<&str> {
        self.featured_image
            .iter()
            .chain(self.other_images.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NewsStatus {
    /// Not visible on the public site
    #[default]
    Draft,
    Published,
    /// Hidden but kept
    Archived,
}

impl NewsStatus {
    /// Database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsStatus::Draft => "draft",
            NewsStatus::Published => "published",
            NewsStatus::Archived => "archived",
        }
    }

    /// Parse from the database or a query string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(NewsStatus::Draft),
            "published" => Some(NewsStatus::Published),
            "archived" => Some(NewsStatus::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for NewsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Id and name of a related entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityRef {
    pub id: i64,
    pub name: String,
}

/// News article together with the entities it is linked to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsDetail {
    #[serde(flatten)]
    pub news: News,
    pub category: Option<EntityRef>,
    pub tags: Vec<EntityRef>,
    pub classifications: Vec<EntityRef>,
}

/// Filters for news listings; `None` fields impose no constraint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewsFilters {
    /// Case-insensitive substring match on the title
    pub search: Option<String>,
    pub status: Option<NewsStatus>,
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub classification_id: Option<i64>,
}

impl NewsFilters {
    pub fn search_pattern(&self) -> Option<String> {
        contains_pattern(self.search.as_deref())
    }
}

/// Input for creating a news article
#[derive(Debug, Clone, Default)]
pub struct CreateNewsInput {
    pub title: String,
    /// Generated from the title when absent
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    pub featured_image: Option<String>,
    pub other_images: Vec<String>,
    pub category_id: i64,
    /// Defaults to `Draft`
    pub status: Option<NewsStatus>,
    /// Estimated from the content when absent
    pub read_time: Option<i32>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub tag_ids: Vec<i64>,
    pub classification_ids: Vec<i64>,
}

impl CreateNewsInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>, category_id: i64) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category_id,
            ..Default::default()
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_status(mut self, status: NewsStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<i64>) -> Self {
        self.tag_ids = tag_ids;
        self
    }

    pub fn with_classifications(mut self, classification_ids: Vec<i64>) -> Self {
        self.classification_ids = classification_ids;
        self
    }

    pub fn with_featured_image(mut self, path: impl Into<String>) -> Self {
        self.featured_image = Some(path.into());
        self
    }
}

/// Partial update for a news article.
///
/// `Some(None)` on a nullable column clears it. Link sets are replaced
/// wholesale when present.
#[derive(Debug, Clone, Default)]
pub struct UpdateNewsInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<Option<String>>,
    pub content: Option<String>,
    pub featured_image: Option<Option<String>>,
    pub other_images: Option<Vec<String>>,
    pub category_id: Option<i64>,
    pub status: Option<NewsStatus>,
    pub read_time: Option<Option<i32>>,
    pub meta_description: Option<Option<String>>,
    pub meta_keywords: Option<Option<String>>,
    pub tag_ids: Option<Vec<i64>>,
    pub classification_ids: Option<Vec<i64>>,
}

/// Turn a title into a URL slug.
///
/// Letters and digits are lowercased and kept (including non-ASCII letters);
/// every other run of characters becomes a single `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Estimated reading time in whole minutes, never less than one
pub fn estimate_read_time(content: &str) -> i32 {
    let words = content.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    i32::try_from(minutes).unwrap_or(i32::MAX)
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        let per_page = params.per_page.max(1) as i64;
        let total_pages = ((total.max(0) + per_page - 1) / per_page) as u32;
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}
