//! News classification repository
//!
//! Database operations for news classifications, including the priority
//! bookkeeping used for their display order.

use super::{backend, Backend, SortRules, TaxonomySql};
use crate::db::DynDatabasePool;
use crate::models::{
    ClassificationWithCount, EntityFilters, EntityStats, NewsClassification, SortField, SortOrder,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

pub(crate) const CLASSIFICATION_SQL: TaxonomySql = TaxonomySql {
    table: "news_classifications",
    columns: &["id", "name", "priority", "is_active", "created_at", "updated_at"],
    count_join: "LEFT JOIN news_classification_links l ON l.classification_id = e.id",
    count_expr: "COUNT(l.news_id)",
    sort: SortRules {
        columns: &[
            (SortField::Name, "e.name"),
            (SortField::CreatedAt, "e.created_at"),
            (SortField::UpdatedAt, "e.updated_at"),
            (SortField::ArticleCount, "article_count"),
            (SortField::Priority, "e.priority"),
        ],
        default_field: SortField::Priority,
        default_order: SortOrder::Asc,
    },
};

/// Appends after the current maximum; `MAX` is cast so MySQL returns an integer
const INSERT_APPENDED_SQLITE: &str = r#"
    INSERT INTO news_classifications (name, priority, is_active, created_at, updated_at)
    SELECT ?, COALESCE(MAX(priority), 0) + 1, ?, ?, ? FROM news_classifications
"#;

const INSERT_APPENDED_MYSQL: &str = r#"
    INSERT INTO news_classifications (name, priority, is_active, created_at, updated_at)
    SELECT ?, CAST(COALESCE(MAX(priority), 0) + 1 AS SIGNED), ?, ?, ? FROM news_classifications
"#;

const INSERT_WITH_PRIORITY: &str = r#"
    INSERT INTO news_classifications (name, priority, is_active, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?)
"#;

const UPDATE_CLASSIFICATION: &str = r#"
    UPDATE news_classifications
    SET name = ?, priority = ?, is_active = ?, updated_at = ?
    WHERE id = ?
"#;

const SET_PRIORITY: &str =
    "UPDATE news_classifications SET priority = ?, updated_at = ? WHERE id = ?";

/// News classification repository trait
#[async_trait]
pub trait ClassificationRepository: Send + Sync {
    /// Insert a classification.
    ///
    /// With `priority = None` the row is placed after the current highest
    /// priority (1 on an empty table).
    async fn create(
        &self,
        classification: &NewsClassification,
        priority: Option<i32>,
    ) -> Result<NewsClassification>;

    async fn find_all(&self, filters: &EntityFilters) -> Result<Vec<ClassificationWithCount>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ClassificationWithCount>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<NewsClassification>>;

    /// Persist `name`, `priority` and `is_active`, refreshing `updated_at`
    async fn update(
        &self,
        classification: &NewsClassification,
    ) -> Result<Option<NewsClassification>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn toggle_active(&self, id: i64) -> Result<Option<NewsClassification>>;

    async fn stats(&self) -> Result<EntityStats>;

    /// Set `priority = position + 1` for each id, in one transaction.
    ///
    /// Ids that don't exist are skipped.
    async fn reorder(&self, ordered_ids: &[i64]) -> Result<()>;
}

/// SQLx-based classification repository implementation
pub struct SqlxClassificationRepository {
    pool: DynDatabasePool,
}

impl SqlxClassificationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ClassificationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ClassificationRepository for SqlxClassificationRepository {
    async fn create(
        &self,
        classification: &NewsClassification,
        priority: Option<i32>,
    ) -> Result<NewsClassification> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => create_classification_sqlite(pool, classification, priority).await,
            Backend::Mysql(pool) => create_classification_mysql(pool, classification, priority).await,
        }
    }

    async fn find_all(&self, filters: &EntityFilters) -> Result<Vec<ClassificationWithCount>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => list_classifications_sqlite(pool, filters).await,
            Backend::Mysql(pool) => list_classifications_mysql(pool, filters).await,
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ClassificationWithCount>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => get_classification_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_classification_by_id_mysql(pool, id).await,
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<NewsClassification>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => get_classification_by_name_sqlite(pool, name).await,
            Backend::Mysql(pool) => get_classification_by_name_mysql(pool, name).await,
        }
    }

    async fn update(
        &self,
        classification: &NewsClassification,
    ) -> Result<Option<NewsClassification>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => update_classification_sqlite(pool, classification).await,
            Backend::Mysql(pool) => update_classification_mysql(pool, classification).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => delete_classification_sqlite(pool, id).await,
            Backend::Mysql(pool) => delete_classification_mysql(pool, id).await,
        }
    }

    async fn toggle_active(&self, id: i64) -> Result<Option<NewsClassification>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => toggle_classification_sqlite(pool, id).await,
            Backend::Mysql(pool) => toggle_classification_mysql(pool, id).await,
        }
    }

    async fn stats(&self) -> Result<EntityStats> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => classification_stats_sqlite(pool).await,
            Backend::Mysql(pool) => classification_stats_mysql(pool).await,
        }
    }

    async fn reorder(&self, ordered_ids: &[i64]) -> Result<()> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => reorder_classifications_sqlite(pool, ordered_ids).await,
            Backend::Mysql(pool) => reorder_classifications_mysql(pool, ordered_ids).await,
        }
    }
}

/// 1-based priority for a position in the caller's list
fn priority_for(index: usize) -> Result<i32> {
    i32::try_from(index + 1).context("Too many classifications to reorder")
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_classification_sqlite(
    pool: &SqlitePool,
    classification: &NewsClassification,
    priority: Option<i32>,
) -> Result<NewsClassification> {
    let now = Utc::now();

    let query = match priority {
        Some(priority) => sqlx::query(INSERT_WITH_PRIORITY)
            .bind(&classification.name)
            .bind(priority),
        None => sqlx::query(INSERT_APPENDED_SQLITE).bind(&classification.name),
    };
    let result = query
        .bind(classification.is_active)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create classification")?;

    get_plain_classification_sqlite(pool, result.last_insert_rowid())
        .await?
        .context("Created classification not found")
}

async fn list_classifications_sqlite(
    pool: &SqlitePool,
    filters: &EntityFilters,
) -> Result<Vec<ClassificationWithCount>> {
    let query = CLASSIFICATION_SQL.list(filters);
    let mut q = sqlx::query(&query.sql);
    if let Some(pattern) = &query.search_pattern {
        q = q.bind(pattern);
    }
    if let Some(is_active) = query.is_active {
        q = q.bind(is_active);
    }

    let rows = q
        .fetch_all(pool)
        .await
        .context("Failed to list classifications")?;

    rows.iter()
        .map(|row| {
            Ok(ClassificationWithCount::new(
                row_to_classification_sqlite(row)?,
                row.try_get("article_count")?,
            ))
        })
        .collect()
}

async fn get_classification_by_id_sqlite(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<ClassificationWithCount>> {
    let row = sqlx::query(&CLASSIFICATION_SQL.by_id())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get classification by ID")?;

    match row {
        Some(row) => Ok(Some(ClassificationWithCount::new(
            row_to_classification_sqlite(&row)?,
            row.try_get("article_count")?,
        ))),
        None => Ok(None),
    }
}

async fn get_classification_by_name_sqlite(
    pool: &SqlitePool,
    name: &str,
) -> Result<Option<NewsClassification>> {
    let row = sqlx::query(&CLASSIFICATION_SQL.by_name())
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get classification by name")?;

    row.as_ref().map(row_to_classification_sqlite).transpose()
}

async fn get_plain_classification_sqlite(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<NewsClassification>> {
    let row = sqlx::query(&CLASSIFICATION_SQL.plain_by_id())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get classification by ID")?;

    row.as_ref().map(row_to_classification_sqlite).transpose()
}

async fn update_classification_sqlite(
    pool: &SqlitePool,
    classification: &NewsClassification,
) -> Result<Option<NewsClassification>> {
    let result = sqlx::query(UPDATE_CLASSIFICATION)
        .bind(&classification.name)
        .bind(classification.priority)
        .bind(classification.is_active)
        .bind(Utc::now())
        .bind(classification.id)
        .execute(pool)
        .await
        .context("Failed to update classification")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_plain_classification_sqlite(pool, classification.id).await
}

async fn delete_classification_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query(&CLASSIFICATION_SQL.delete())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete classification")?;

    Ok(result.rows_affected() > 0)
}

async fn toggle_classification_sqlite(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<NewsClassification>> {
    let result = sqlx::query(&CLASSIFICATION_SQL.toggle())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to toggle classification")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_plain_classification_sqlite(pool, id).await
}

async fn classification_stats_sqlite(pool: &SqlitePool) -> Result<EntityStats> {
    let rows = sqlx::query(&CLASSIFICATION_SQL.stats())
        .fetch_all(pool)
        .await
        .context("Failed to get classification stats")?;

    let groups = rows
        .iter()
        .map(|row| Ok((row.try_get("is_active")?, row.try_get("count")?)))
        .collect::<Result<Vec<(bool, i64)>>>()?;
    Ok(EntityStats::from_groups(groups))
}

async fn reorder_classifications_sqlite(pool: &SqlitePool, ordered_ids: &[i64]) -> Result<()> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin reorder")?;

    for (index, id) in ordered_ids.iter().enumerate() {
        sqlx::query(SET_PRIORITY)
            .bind(priority_for(index)?)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to set priority of classification {}", id))?;
    }

    tx.commit().await.context("Failed to commit reorder")?;
    Ok(())
}

fn row_to_classification_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<NewsClassification> {
    Ok(NewsClassification {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        priority: row.try_get("priority")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_classification_mysql(
    pool: &MySqlPool,
    classification: &NewsClassification,
    priority: Option<i32>,
) -> Result<NewsClassification> {
    let now = Utc::now();

    let query = match priority {
        Some(priority) => sqlx::query(INSERT_WITH_PRIORITY)
            .bind(&classification.name)
            .bind(priority),
        None => sqlx::query(INSERT_APPENDED_MYSQL).bind(&classification.name),
    };
    let result = query
        .bind(classification.is_active)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create classification")?;

    get_plain_classification_mysql(pool, result.last_insert_id() as i64)
        .await?
        .context("Created classification not found")
}

async fn list_classifications_mysql(
    pool: &MySqlPool,
    filters: &EntityFilters,
) -> Result<Vec<ClassificationWithCount>> {
    let query = CLASSIFICATION_SQL.list(filters);
    let mut q = sqlx::query(&query.sql);
    if let Some(pattern) = &query.search_pattern {
        q = q.bind(pattern);
    }
    if let Some(is_active) = query.is_active {
        q = q.bind(is_active);
    }

    let rows = q
        .fetch_all(pool)
        .await
        .context("Failed to list classifications")?;

    rows.iter()
        .map(|row| {
            Ok(ClassificationWithCount::new(
                row_to_classification_mysql(row)?,
                row.try_get("article_count")?,
            ))
        })
        .collect()
}

async fn get_classification_by_id_mysql(
    pool: &MySqlPool,
    id: i64,
) -> Result<Option<ClassificationWithCount>> {
    let row = sqlx::query(&CLASSIFICATION_SQL.by_id())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get classification by ID")?;

    match row {
        Some(row) => Ok(Some(ClassificationWithCount::new(
            row_to_classification_mysql(&row)?,
            row.try_get("article_count")?,
        ))),
        None => Ok(None),
    }
}

async fn get_classification_by_name_mysql(
    pool: &MySqlPool,
    name: &str,
) -> Result<Option<NewsClassification>> {
    let row = sqlx::query(&CLASSIFICATION_SQL.by_name())
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get classification by name")?;

    row.as_ref().map(row_to_classification_mysql).transpose()
}

async fn get_plain_classification_mysql(
    pool: &MySqlPool,
    id: i64,
) -> Result<Option<NewsClassification>> {
    let row = sqlx::query(&CLASSIFICATION_SQL.plain_by_id())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get classification by ID")?;

    row.as_ref().map(row_to_classification_mysql).transpose()
}

async fn update_classification_mysql(
    pool: &MySqlPool,
    classification: &NewsClassification,
) -> Result<Option<NewsClassification>> {
    sqlx::query(UPDATE_CLASSIFICATION)
        .bind(&classification.name)
        .bind(classification.priority)
        .bind(classification.is_active)
        .bind(Utc::now())
        .bind(classification.id)
        .execute(pool)
        .await
        .context("Failed to update classification")?;

    get_plain_classification_mysql(pool, classification.id).await
}

async fn delete_classification_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query(&CLASSIFICATION_SQL.delete())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete classification")?;

    Ok(result.rows_affected() > 0)
}

async fn toggle_classification_mysql(
    pool: &MySqlPool,
    id: i64,
) -> Result<Option<NewsClassification>> {
    let result = sqlx::query(&CLASSIFICATION_SQL.toggle())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to toggle classification")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_plain_classification_mysql(pool, id).await
}

async fn classification_stats_mysql(pool: &MySqlPool) -> Result<EntityStats> {
    let rows = sqlx::query(&CLASSIFICATION_SQL.stats())
        .fetch_all(pool)
        .await
        .context("Failed to get classification stats")?;

    let groups = rows
        .iter()
        .map(|row| Ok((row.try_get("is_active")?, row.try_get("count")?)))
        .collect::<Result<Vec<(bool, i64)>>>()?;
    Ok(EntityStats::from_groups(groups))
}

async fn reorder_classifications_mysql(pool: &MySqlPool, ordered_ids: &[i64]) -> Result<()> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin reorder")?;

    for (index, id) in ordered_ids.iter().enumerate() {
        sqlx::query(SET_PRIORITY)
            .bind(priority_for(index)?)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to set priority of classification {}", id))?;
    }

    tx.commit().await.context("Failed to commit reorder")?;
    Ok(())
}

fn row_to_classification_mysql(row: &sqlx::mysql::MySqlRow) -> Result<NewsClassification> {
    Ok(NewsClassification {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        priority: row.try_get("priority")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxClassificationRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxClassificationRepository::new(pool)
    }

    fn classification(name: &str) -> NewsClassification {
        NewsClassification::new(name.to_string(), 0, true)
    }

    #[tokio::test]
    async fn test_create_appends_priority() {
        let repo = setup_test_repo().await;

        let first = repo.create(&classification("Featured"), None).await.unwrap();
        assert_eq!(first.priority, 1);

        let explicit = repo
            .create(&classification("Breaking"), Some(10))
            .await
            .unwrap();
        assert_eq!(explicit.priority, 10);

        let appended = repo.create(&classification("Local"), None).await.unwrap();
        assert_eq!(appended.priority, 11);
    }

    #[tokio::test]
    async fn test_default_listing_is_priority_ascending() {
        let repo = setup_test_repo().await;
        repo.create(&classification("Low"), Some(3)).await.unwrap();
        repo.create(&classification("High"), Some(1)).await.unwrap();
        repo.create(&classification("Mid"), Some(2)).await.unwrap();

        let listed = repo.find_all(&EntityFilters::new()).await.unwrap();
        let names: Vec<_> = listed.iter().map(|c| c.item.name.as_str()).collect();
        assert_eq!(names, vec!["High", "Mid", "Low"]);
    }

    #[tokio::test]
    async fn test_reorder_sets_dense_priorities() {
        let repo = setup_test_repo().await;
        let a = repo.create(&classification("A"), None).await.unwrap();
        let b = repo.create(&classification("B"), None).await.unwrap();
        let c = repo.create(&classification("C"), None).await.unwrap();

        repo.reorder(&[c.id, a.id, 99999, b.id]).await.unwrap();

        let listed = repo.find_all(&EntityFilters::new()).await.unwrap();
        let order: Vec<_> = listed.iter().map(|x| (x.item.id, x.item.priority)).collect();
        assert_eq!(order, vec![(c.id, 1), (a.id, 2), (b.id, 4)]);
    }

    #[tokio::test]
    async fn test_update_priority() {
        let repo = setup_test_repo().await;
        let mut item = repo.create(&classification("Spotlight"), None).await.unwrap();

        item.priority = 42;
        let updated = repo.update(&item).await.unwrap().unwrap();
        assert_eq!(updated.priority, 42);
    }
}
