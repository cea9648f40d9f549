//! Tag repository
//!
//! Database operations for tags.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL

use super::{backend, Backend, SortRules, TaxonomySql};
use crate::db::DynDatabasePool;
use crate::models::{EntityFilters, EntityStats, SortField, SortOrder, Tag, TagWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

pub(crate) const TAG_SQL: TaxonomySql = TaxonomySql {
    table: "tags",
    columns: &["id", "name", "is_active", "created_at", "updated_at"],
    count_join: "LEFT JOIN news_tag_links l ON l.tag_id = e.id",
    count_expr: "COUNT(l.news_id)",
    sort: SortRules {
        columns: &[
            (SortField::Name, "e.name"),
            (SortField::CreatedAt, "e.created_at"),
            (SortField::UpdatedAt, "e.updated_at"),
            (SortField::ArticleCount, "article_count"),
        ],
        default_field: SortField::CreatedAt,
        default_order: SortOrder::Desc,
    },
};

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Insert a tag and return the stored row
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// List tags with article counts
    async fn find_all(&self, filters: &EntityFilters) -> Result<Vec<TagWithCount>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<TagWithCount>>;

    /// Exact, case-sensitive name lookup
    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// Persist `name` and `is_active`, refreshing `updated_at`.
    ///
    /// Returns `None` when the row no longer exists.
    async fn update(&self, tag: &Tag) -> Result<Option<Tag>>;

    /// Returns whether a row was deleted
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Flip `is_active` atomically; `None` when the id doesn't exist
    async fn toggle_active(&self, id: i64) -> Result<Option<Tag>>;

    async fn stats(&self) -> Result<EntityStats>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => create_tag_sqlite(pool, tag).await,
            Backend::Mysql(pool) => create_tag_mysql(pool, tag).await,
        }
    }

    async fn find_all(&self, filters: &EntityFilters) -> Result<Vec<TagWithCount>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => list_tags_sqlite(pool, filters).await,
            Backend::Mysql(pool) => list_tags_mysql(pool, filters).await,
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<TagWithCount>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => get_tag_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_tag_by_id_mysql(pool, id).await,
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => get_tag_by_name_sqlite(pool, name).await,
            Backend::Mysql(pool) => get_tag_by_name_mysql(pool, name).await,
        }
    }

    async fn update(&self, tag: &Tag) -> Result<Option<Tag>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => update_tag_sqlite(pool, tag).await,
            Backend::Mysql(pool) => update_tag_mysql(pool, tag).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => delete_tag_sqlite(pool, id).await,
            Backend::Mysql(pool) => delete_tag_mysql(pool, id).await,
        }
    }

    async fn toggle_active(&self, id: i64) -> Result<Option<Tag>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => toggle_tag_sqlite(pool, id).await,
            Backend::Mysql(pool) => toggle_tag_mysql(pool, id).await,
        }
    }

    async fn stats(&self) -> Result<EntityStats> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => tag_stats_sqlite(pool).await,
            Backend::Mysql(pool) => tag_stats_mysql(pool).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO tags (name, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&tag.name)
    .bind(tag.is_active)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        name: tag.name.clone(),
        is_active: tag.is_active,
        created_at: now,
        updated_at: now,
    })
}

async fn list_tags_sqlite(pool: &SqlitePool, filters: &EntityFilters) -> Result<Vec<TagWithCount>> {
    let query = TAG_SQL.list(filters);
    let mut q = sqlx::query(&query.sql);
    if let Some(pattern) = &query.search_pattern {
        q = q.bind(pattern);
    }
    if let Some(is_active) = query.is_active {
        q = q.bind(is_active);
    }

    let rows = q.fetch_all(pool).await.context("Failed to list tags")?;

    rows.iter()
        .map(|row| {
            Ok(TagWithCount::new(
                row_to_tag_sqlite(row)?,
                row.try_get("article_count")?,
            ))
        })
        .collect()
}

async fn get_tag_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<TagWithCount>> {
    let row = sqlx::query(&TAG_SQL.by_id())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    match row {
        Some(row) => Ok(Some(TagWithCount::new(
            row_to_tag_sqlite(&row)?,
            row.try_get("article_count")?,
        ))),
        None => Ok(None),
    }
}

async fn get_tag_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<Tag>> {
    let row = sqlx::query(&TAG_SQL.by_name())
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by name")?;

    row.as_ref().map(row_to_tag_sqlite).transpose()
}

async fn get_plain_tag_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query(&TAG_SQL.plain_by_id())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    row.as_ref().map(row_to_tag_sqlite).transpose()
}

async fn update_tag_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Option<Tag>> {
    let result = sqlx::query(
        r#"
        UPDATE tags
        SET name = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&tag.name)
    .bind(tag.is_active)
    .bind(Utc::now())
    .bind(tag.id)
    .execute(pool)
    .await
    .context("Failed to update tag")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_plain_tag_sqlite(pool, tag.id).await
}

async fn delete_tag_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query(&TAG_SQL.delete())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete tag")?;

    Ok(result.rows_affected() > 0)
}

async fn toggle_tag_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Tag>> {
    let result = sqlx::query(&TAG_SQL.toggle())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to toggle tag")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_plain_tag_sqlite(pool, id).await
}

async fn tag_stats_sqlite(pool: &SqlitePool) -> Result<EntityStats> {
    let rows = sqlx::query(&TAG_SQL.stats())
        .fetch_all(pool)
        .await
        .context("Failed to get tag stats")?;

    let groups = rows
        .iter()
        .map(|row| Ok((row.try_get("is_active")?, row.try_get("count")?)))
        .collect::<Result<Vec<(bool, i64)>>>()?;
    Ok(EntityStats::from_groups(groups))
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO tags (name, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&tag.name)
    .bind(tag.is_active)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_id() as i64,
        name: tag.name.clone(),
        is_active: tag.is_active,
        created_at: now,
        updated_at: now,
    })
}

async fn list_tags_mysql(pool: &MySqlPool, filters: &EntityFilters) -> Result<Vec<TagWithCount>> {
    let query = TAG_SQL.list(filters);
    let mut q = sqlx::query(&query.sql);
    if let Some(pattern) = &query.search_pattern {
        q = q.bind(pattern);
    }
    if let Some(is_active) = query.is_active {
        q = q.bind(is_active);
    }

    let rows = q.fetch_all(pool).await.context("Failed to list tags")?;

    rows.iter()
        .map(|row| {
            Ok(TagWithCount::new(
                row_to_tag_mysql(row)?,
                row.try_get("article_count")?,
            ))
        })
        .collect()
}

async fn get_tag_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<TagWithCount>> {
    let row = sqlx::query(&TAG_SQL.by_id())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    match row {
        Some(row) => Ok(Some(TagWithCount::new(
            row_to_tag_mysql(&row)?,
            row.try_get("article_count")?,
        ))),
        None => Ok(None),
    }
}

async fn get_tag_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<Option<Tag>> {
    let row = sqlx::query(&TAG_SQL.by_name())
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by name")?;

    row.as_ref().map(row_to_tag_mysql).transpose()
}

async fn get_plain_tag_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query(&TAG_SQL.plain_by_id())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    row.as_ref().map(row_to_tag_mysql).transpose()
}

async fn update_tag_mysql(pool: &MySqlPool, tag: &Tag) -> Result<Option<Tag>> {
    // MySQL counts matched-but-unchanged rows as unaffected, so re-read
    // instead of trusting rows_affected.
    sqlx::query(
        r#"
        UPDATE tags
        SET name = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&tag.name)
    .bind(tag.is_active)
    .bind(Utc::now())
    .bind(tag.id)
    .execute(pool)
    .await
    .context("Failed to update tag")?;

    get_plain_tag_mysql(pool, tag.id).await
}

async fn delete_tag_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query(&TAG_SQL.delete())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete tag")?;

    Ok(result.rows_affected() > 0)
}

async fn toggle_tag_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Tag>> {
    let result = sqlx::query(&TAG_SQL.toggle())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to toggle tag")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_plain_tag_mysql(pool, id).await
}

async fn tag_stats_mysql(pool: &MySqlPool) -> Result<EntityStats> {
    let rows = sqlx::query(&TAG_SQL.stats())
        .fetch_all(pool)
        .await
        .context("Failed to get tag stats")?;

    let groups = rows
        .iter()
        .map(|row| Ok((row.try_get("is_active")?, row.try_get("count")?)))
        .collect::<Result<Vec<(bool, i64)>>>()?;
    Ok(EntityStats::from_groups(groups))
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
