//! News service
//!
//! Implements business logic for news articles:
//! - Slug generation and uniqueness
//! - Category, tag and classification reference checks
//! - Publication timestamps and reading-time estimates
//! - Removing image files an article no longer references

use crate::db::is_unique_violation;
use crate::db::repositories::news::{LinkChanges, RelatedTable};
use crate::db::repositories::NewsRepository;
use crate::models::{
    estimate_read_time, slugify, CreateNewsInput, ListParams, News, NewsDetail, NewsFilters,
    NewsStatus, PagedResult, UpdateNewsInput, NEWS_TITLE_MAX_LEN,
};
use crate::services::error::{EntityKind, ServiceError};
use crate::services::upload::ImageStore;
use anyhow::Context;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

const KIND: EntityKind = EntityKind::News;

/// News service
pub struct NewsService {
    repo: Arc<dyn NewsRepository>,
    images: Arc<ImageStore>,
}

impl NewsService {
    pub fn new(repo: Arc<dyn NewsRepository>, images: Arc<ImageStore>) -> Self {
        Self { repo, images }
    }

    /// Create an article with its tag and classification links.
    ///
    /// # Errors
    /// - `Validation` for a blank title or content, an unknown category, tag
    ///   or classification
    /// - `DuplicateSlug` if the slug is taken
    pub async fn create(&self, input: CreateNewsInput) -> Result<NewsDetail, ServiceError> {
        let title = validate_title(&input.title)?;
        let content = validate_content(&input.content)?;
        let slug = match input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => validate_slug(raw)?,
            None => validate_slug(&title)?,
        };

        if self
            .repo
            .find_by_slug(&slug)
            .await
            .context("Failed to check existing slug")?
            .is_some()
        {
            return Err(ServiceError::DuplicateSlug(slug));
        }

        self.ensure_category(input.category_id).await?;
        let tag_ids = self.ensure_related(RelatedTable::Tags, &input.tag_ids).await?;
        let classification_ids = self
            .ensure_related(RelatedTable::Classifications, &input.classification_ids)
            .await?;

        let status = input.status.unwrap_or_default();
        let now = Utc::now();
        let news = News {
            id: 0,
            title,
            slug,
            excerpt: normalize_text(input.excerpt),
            read_time: Some(
                input
                    .read_time
                    .filter(|t| *t > 0)
                    .unwrap_or_else(|| estimate_read_time(&content)),
            ),
            content,
            featured_image: normalize_text(input.featured_image),
            other_images: input.other_images,
            category_id: input.category_id,
            status,
            view_count: 0,
            meta_description: normalize_text(input.meta_description),
            meta_keywords: normalize_text(input.meta_keywords),
            published_at: (status == NewsStatus::Published).then_some(now),
            created_at: now,
            updated_at: now,
        };

        let created = self
            .repo
            .create(&news, &tag_ids, &classification_ids)
            .await
            .map_err(|e| slug_conflict(&news.slug, e))?;

        tracing::info!("Created news {} ({})", created.id, created.slug);
        Ok(self
            .repo
            .load_detail(created)
            .await
            .context("Failed to load news detail")?)
    }

    /// One page of articles, newest first
    pub async fn list(
        &self,
        filters: &NewsFilters,
        params: &ListParams,
    ) -> Result<PagedResult<News>, ServiceError> {
        let (items, total) = self
            .repo
            .list(filters, params)
            .await
            .context("Failed to list news")?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<NewsDetail>, ServiceError> {
        let news = self
            .repo
            .find_by_id(id)
            .await
            .context("Failed to get news by ID")?;
        self.detail(news).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<NewsDetail>, ServiceError> {
        let news = self
            .repo
            .find_by_slug(slug)
            .await
            .context("Failed to get news by slug")?;
        self.detail(news).await
    }

    /// Count one view; returns the updated article.
    pub async fn record_view(&self, id: i64) -> Result<News, ServiceError> {
        if !self
            .repo
            .increment_views(id)
            .await
            .context("Failed to record view")?
        {
            return Err(ServiceError::NotFound(KIND));
        }
        self.repo
            .find_by_id(id)
            .await
            .context("Failed to get news by ID")?
            .ok_or(ServiceError::NotFound(KIND))
    }

    /// Apply a partial update; `Ok(None)` when the article doesn't exist.
    ///
    /// Images dropped by the update are deleted once the row is saved.
    pub async fn update(
        &self,
        id: i64,
        input: UpdateNewsInput,
    ) -> Result<Option<NewsDetail>, ServiceError> {
        let Some(existing) = self
            .repo
            .find_by_id(id)
            .await
            .context("Failed to get news by ID")?
        else {
            return Ok(None);
        };
        let mut news = existing.clone();

        if let Some(title) = input.title {
            news.title = validate_title(&title)?;
        }
        if let Some(raw) = input.slug {
            let slug = validate_slug(&raw)?;
            if slug != existing.slug {
                if let Some(owner) = self
                    .repo
                    .find_by_slug(&slug)
                    .await
                    .context("Failed to check existing slug")?
                {
                    if owner.id != id {
                        return Err(ServiceError::DuplicateSlug(slug));
                    }
                }
            }
            news.slug = slug;
        }
        if let Some(content) = input.content {
            news.content = validate_content(&content)?;
            if input.read_time.is_none() {
                news.read_time = Some(estimate_read_time(&news.content));
            }
        }
        if let Some(read_time) = input.read_time {
            news.read_time = read_time.filter(|t| *t > 0);
        }
        if let Some(excerpt) = input.excerpt {
            news.excerpt = normalize_text(excerpt);
        }
        if let Some(featured_image) = input.featured_image {
            news.featured_image = normalize_text(featured_image);
        }
        if let Some(other_images) = input.other_images {
            news.other_images = other_images;
        }
        if let Some(category_id) = input.category_id {
            self.ensure_category(category_id).await?;
            news.category_id = category_id;
        }
        if let Some(status) = input.status {
            news.status = status;
            if status == NewsStatus::Published && news.published_at.is_none() {
                news.published_at = Some(Utc::now());
            }
        }
        if let Some(meta_description) = input.meta_description {
            news.meta_description = normalize_text(meta_description);
        }
        if let Some(meta_keywords) = input.meta_keywords {
            news.meta_keywords = normalize_text(meta_keywords);
        }

        let tag_ids = match &input.tag_ids {
            Some(ids) => Some(self.ensure_related(RelatedTable::Tags, ids).await?),
            None => None,
        };
        let classification_ids = match &input.classification_ids {
            Some(ids) => Some(
                self.ensure_related(RelatedTable::Classifications, ids)
                    .await?,
            ),
            None => None,
        };

        let updated = self
            .repo
            .update(
                &news,
                LinkChanges {
                    tag_ids: tag_ids.as_deref(),
                    classification_ids: classification_ids.as_deref(),
                },
            )
            .await
            .map_err(|e| slug_conflict(&news.slug, e))?;
        let Some(updated) = updated else {
            return Ok(None);
        };

        let kept: HashSet<&str> = updated.image_paths().into_iter().collect();
        for path in existing.image_paths() {
            if !kept.contains(path) {
                self.images.delete(path);
            }
        }

        Ok(Some(
            self.repo
                .load_detail(updated)
                .await
                .context("Failed to load news detail")?,
        ))
    }

    /// Delete an article and its image files; returns the deleted row.
    pub async fn delete(&self, id: i64) -> Result<News, ServiceError> {
        let existing = self
            .repo
            .find_by_id(id)
            .await
            .context("Failed to get news by ID")?
            .ok_or(ServiceError::NotFound(KIND))?;

        if !self.repo.delete(id).await.context("Failed to delete news")? {
            return Err(ServiceError::NotFound(KIND));
        }
        for path in existing.image_paths() {
            self.images.delete(path);
        }

        tracing::info!("Deleted news {} ({})", id, existing.slug);
        Ok(existing)
    }

    async fn detail(&self, news: Option<News>) -> Result<Option<NewsDetail>, ServiceError> {
        match news {
            Some(news) => Ok(Some(
                self.repo
                    .load_detail(news)
                    .await
                    .context("Failed to load news detail")?,
            )),
            None => Ok(None),
        }
    }

    async fn ensure_category(&self, category_id: i64) -> Result<(), ServiceError> {
        let found = self
            .repo
            .existing_ids(RelatedTable::Categories, &[category_id])
            .await
            .context("Failed to check category")?;
        if found.is_empty() {
            return Err(ServiceError::Validation("Category not found".to_string()));
        }
        Ok(())
    }

    /// Deduplicate `ids` (keeping first occurrences) and check they all exist
    async fn ensure_related(
        &self,
        table: RelatedTable,
        ids: &[i64],
    ) -> Result<Vec<i64>, ServiceError> {
        let mut seen = HashSet::new();
        let unique: Vec<i64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let found: HashSet<i64> = self
            .repo
            .existing_ids(table, &unique)
            .await
            .context("Failed to check related ids")?
            .into_iter()
            .collect();
        let missing: Vec<String> = unique
            .iter()
            .filter(|id| !found.contains(id))
            .map(|id| id.to_string())
            .collect();

        if !missing.is_empty() {
            let label = match table {
                RelatedTable::Tags => "Tag",
                RelatedTable::Classifications => "Classification",
                RelatedTable::Categories => "Category",
            };
            return Err(ServiceError::Validation(format!(
                "{} not found: {}",
                label,
                missing.join(", ")
            )));
        }
        Ok(unique)
    }
}

fn slug_conflict(slug: &str, err: anyhow::Error) -> ServiceError {
    if is_unique_violation(&err) {
        tracing::warn!("Unique index rejected news slug {}: {:#}", slug, err);
        ServiceError::DuplicateSlug(slug.to_string())
    } else {
        ServiceError::Internal(err)
    }
}

fn validate_title(raw: &str) -> Result<String, ServiceError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ServiceError::Validation(
            "News title is required and must be a non-empty string".to_string(),
        ));
    }
    if title.chars().count() > NEWS_TITLE_MAX_LEN {
        return Err(ServiceError::Validation(format!(
            "News title must be at most {} characters",
            NEWS_TITLE_MAX_LEN
        )));
    }
    Ok(title.to_string())
}

fn validate_content(raw: &str) -> Result<String, ServiceError> {
    if raw.trim().is_empty() {
        return Err(ServiceError::Validation(
            "News content is required".to_string(),
        ));
    }
    Ok(raw.to_string())
}

fn validate_slug(raw: &str) -> Result<String, ServiceError> {
    let slug = slugify(raw);
    if slug.is_empty() {
        return Err(ServiceError::Validation(
            "Slug must contain at least one letter or digit".to_string(),
        ));
    }
    if slug.chars().count() > NEWS_TITLE_MAX_LEN {
        return Err(ServiceError::Validation(format!(
            "Slug must be at most {} characters",
            NEWS_TITLE_MAX_LEN
        )));
    }
    Ok(slug)
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
