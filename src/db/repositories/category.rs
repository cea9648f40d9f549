//! Category repository
//!
//! Database operations for categories. A category's article count is the
//! number of `news` rows whose `category_id` points at it.

use super::{backend, Backend, SortRules, TaxonomySql};
use crate::db::DynDatabasePool;
use crate::models::{Category, CategoryWithCount, EntityFilters, EntityStats, SortField, SortOrder};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

pub(crate) const CATEGORY_SQL: TaxonomySql = TaxonomySql {
    table: "categories",
    columns: &["id", "name", "description", "is_active", "created_at", "updated_at"],
    count_join: "LEFT JOIN news n ON n.category_id = e.id",
    count_expr: "COUNT(n.id)",
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

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &Category) -> Result<Category>;

    /// List categories with article counts
    async fn find_all(&self, filters: &EntityFilters) -> Result<Vec<CategoryWithCount>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<CategoryWithCount>>;

    /// Exact, case-sensitive name lookup
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// Persist `name`, `description` and `is_active`, refreshing `updated_at`
    async fn update(&self, category: &Category) -> Result<Option<Category>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn toggle_active(&self, id: i64) -> Result<Option<Category>>;

    async fn stats(&self) -> Result<EntityStats>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => create_category_sqlite(pool, category).await,
            Backend::Mysql(pool) => create_category_mysql(pool, category).await,
        }
    }

    async fn find_all(&self, filters: &EntityFilters) -> Result<Vec<CategoryWithCount>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => list_categories_sqlite(pool, filters).await,
            Backend::Mysql(pool) => list_categories_mysql(pool, filters).await,
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CategoryWithCount>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => get_category_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_category_by_id_mysql(pool, id).await,
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => get_category_by_name_sqlite(pool, name).await,
            Backend::Mysql(pool) => get_category_by_name_mysql(pool, name).await,
        }
    }

    async fn update(&self, category: &Category) -> Result<Option<Category>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => update_category_sqlite(pool, category).await,
            Backend::Mysql(pool) => update_category_mysql(pool, category).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => delete_category_sqlite(pool, id).await,
            Backend::Mysql(pool) => delete_category_mysql(pool, id).await,
        }
    }

    async fn toggle_active(&self, id: i64) -> Result<Option<Category>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => toggle_category_sqlite(pool, id).await,
            Backend::Mysql(pool) => toggle_category_mysql(pool, id).await,
        }
    }

    async fn stats(&self) -> Result<EntityStats> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => category_stats_sqlite(pool).await,
            Backend::Mysql(pool) => category_stats_mysql(pool).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, description, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.name)
    .bind(&category.description)
    .bind(category.is_active)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..category.clone()
    })
}

async fn list_categories_sqlite(
    pool: &SqlitePool,
    filters: &EntityFilters,
) -> Result<Vec<CategoryWithCount>> {
    let query = CATEGORY_SQL.list(filters);
    let mut q = sqlx::query(&query.sql);
    if let Some(pattern) = &query.search_pattern {
        q = q.bind(pattern);
    }
    if let Some(is_active) = query.is_active {
        q = q.bind(is_active);
    }

    let rows = q.fetch_all(pool).await.context("Failed to list categories")?;

    rows.iter()
        .map(|row| {
            Ok(CategoryWithCount::new(
                row_to_category_sqlite(row)?,
                row.try_get("article_count")?,
            ))
        })
        .collect()
}

async fn get_category_by_id_sqlite(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<CategoryWithCount>> {
    let row = sqlx::query(&CATEGORY_SQL.by_id())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    match row {
        Some(row) => Ok(Some(CategoryWithCount::new(
            row_to_category_sqlite(&row)?,
            row.try_get("article_count")?,
        ))),
        None => Ok(None),
    }
}

async fn get_category_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<Category>> {
    let row = sqlx::query(&CATEGORY_SQL.by_name())
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by name")?;

    row.as_ref().map(row_to_category_sqlite).transpose()
}

async fn get_plain_category_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(&CATEGORY_SQL.plain_by_id())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    row.as_ref().map(row_to_category_sqlite).transpose()
}

/// Fails with a foreign-key error while news rows reference the category
async fn delete_category_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query(&CATEGORY_SQL.delete())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(result.rows_affected() > 0)
}

async fn update_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Option<Category>> {
    let result = sqlx::query(
        r#"
        UPDATE categories
        SET name = ?, description = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&category.name)
    .bind(&category.description)
    .bind(category.is_active)
    .bind(Utc::now())
    .bind(category.id)
    .execute(pool)
    .await
    .context("Failed to update category")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_plain_category_sqlite(pool, category.id).await
}

async fn toggle_category_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let result = sqlx::query(&CATEGORY_SQL.toggle())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to toggle category")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_plain_category_sqlite(pool, id).await
}

async fn category_stats_sqlite(pool: &SqlitePool) -> Result<EntityStats> {
    let rows = sqlx::query(&CATEGORY_SQL.stats())
        .fetch_all(pool)
        .await
        .context("Failed to get category stats")?;

    let groups = rows
        .iter()
        .map(|row| Ok((row.try_get("is_active")?, row.try_get("count")?)))
        .collect::<Result<Vec<(bool, i64)>>>()?;
    Ok(EntityStats::from_groups(groups))
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, description, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.name)
    .bind(&category.description)
    .bind(category.is_active)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..category.clone()
    })
}

async fn list_categories_mysql(
    pool: &MySqlPool,
    filters: &EntityFilters,
) -> Result<Vec<CategoryWithCount>> {
    let query = CATEGORY_SQL.list(filters);
    let mut q = sqlx::query(&query.sql);
    if let Some(pattern) = &query.search_pattern {
        q = q.bind(pattern);
    }
    if let Some(is_active) = query.is_active {
        q = q.bind(is_active);
    }

    let rows = q.fetch_all(pool).await.context("Failed to list categories")?;

    rows.iter()
        .map(|row| {
            Ok(CategoryWithCount::new(
                row_to_category_mysql(row)?,
                row.try_get("article_count")?,
            ))
        })
        .collect()
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<CategoryWithCount>> {
    let row = sqlx::query(&CATEGORY_SQL.by_id())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    match row {
        Some(row) => Ok(Some(CategoryWithCount::new(
            row_to_category_mysql(&row)?,
            row.try_get("article_count")?,
        ))),
        None => Ok(None),
    }
}

async fn get_category_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<Option<Category>> {
    let row = sqlx::query(&CATEGORY_SQL.by_name())
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by name")?;

    row.as_ref().map(row_to_category_mysql).transpose()
}

async fn get_plain_category_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(&CATEGORY_SQL.plain_by_id())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    row.as_ref().map(row_to_category_mysql).transpose()
}

async fn delete_category_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query(&CATEGORY_SQL.delete())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(result.rows_affected() > 0)
}

async fn update_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Option<Category>> {
    sqlx::query(
        r#"
        UPDATE categories
        SET name = ?, description = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&category.name)
    .bind(&category.description)
    .bind(category.is_active)
    .bind(Utc::now())
    .bind(category.id)
    .execute(pool)
    .await
    .context("Failed to update category")?;

    get_plain_category_mysql(pool, category.id).await
}

async fn toggle_category_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let result = sqlx::query(&CATEGORY_SQL.toggle())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to toggle category")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_plain_category_mysql(pool, id).await
}

async fn category_stats_mysql(pool: &MySqlPool) -> Result<EntityStats> {
    let rows = sqlx::query(&CATEGORY_SQL.stats())
        .fetch_all(pool)
        .await
        .context("Failed to get category stats")?;

    let groups = rows
        .iter()
        .map(|row| Ok((row.try_get("is_active")?, row.try_get("count")?)))
        .collect::<Result<Vec<(bool, i64)>>>()?;
    Ok(EntityStats::from_groups(groups))
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
