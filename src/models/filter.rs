//! Listing filters and aggregates shared by the taxonomy entities
//!
//! Tags, categories and news classifications are listed with the same
//! filter shape and report the same counters, so the types live here.

use serde::{Deserialize, Serialize};

/// Field a taxonomy listing can be ordered by.
///
/// Not every entity supports every field; repositories fall back to their
/// default ordering for fields they don't have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Name,
    CreatedAt,
    UpdatedAt,
    ArticleCount,
    Priority,
}

impl SortField {
    /// Parse a query-string value; accepts camelCase and snake_case spellings.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "name" => Some(Self::Name),
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            "updatedAt" | "updated_at" => Some(Self::UpdatedAt),
            "articleCount" | "article_count" => Some(Self::ArticleCount),
            "priority" => Some(Self::Priority),
            _ => None,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    /// SQL keyword for this direction
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filters accepted by every taxonomy `find_all`.
///
/// `None` fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityFilters {
    /// Case-insensitive substring match on `name`
    pub search: Option<String>,
    /// Exact match on `is_active`
    pub is_active: Option<bool>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
}

impl EntityFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn sorted_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = Some(field);
        self.sort_order = Some(order);
        self
    }

    /// Lowercased `LIKE` pattern for the search term, if any.
    ///
    /// A blank search term is treated as absent.
    pub fn search_pattern(&self) -> Option<String> {
        contains_pattern(self.search.as_deref())
    }
}

/// Escape character declared by every `LIKE ... ESCAPE '!'` clause
const LIKE_ESCAPE: char = '!';

/// `%term%` for a case-insensitive substring match, with `%`, `_` and the
/// escape character itself matched literally. Blank terms give `None`.
pub fn contains_pattern(term: Option<&str>) -> Option<String> {
    let term = term.map(str::trim).filter(|s| !s.is_empty())?;

    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

/// Active/inactive counters for one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

impl EntityStats {
    /// Build from the `(is_active, count)` groups of an aggregate query
    pub fn from_groups(groups: impl IntoIterator<Item = (bool, i64)>) -> Self {
        let mut stats = Self::default();
        for (is_active, count) in groups {
            if is_active {
                stats.active += count;
            } else {
                stats.inactive += count;
            }
            stats.total += count;
        }
        stats
    }
}

/// An entity together with the number of news articles referencing it.
///
/// `article_count` is computed per query and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithArticleCount<T> {
    #[serde(flatten)]
    pub item: T,
    pub article_count: i64,
}

impl<T> WithArticleCount<T> {
    pub fn new(item: T, article_count: i64) -> Self {
        Self {
            item,
            article_count,
        }
    }
}
