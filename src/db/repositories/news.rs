//! News repository
//!
//! Database operations for news articles and their tag/classification links.
//!
//! This module provides:
//! - `NewsRepository` trait defining the interface for news data access
//! - `SqlxNewsRepository` implementing the trait for SQLite and MySQL
//!
//! Link rows are always written in the same transaction as the article row.

use super::{backend, Backend};
use crate::db::DynDatabasePool;
use crate::models::{EntityRef, ListParams, News, NewsDetail, NewsFilters, NewsStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const NEWS_COLUMNS: &str = "n.id, n.title, n.slug, n.excerpt, n.content, n.featured_image, \
    n.other_images, n.category_id, n.status, n.view_count, n.read_time, n.meta_description, \
    n.meta_keywords, n.published_at, n.created_at, n.updated_at";

const INSERT_NEWS: &str = r#"
    INSERT INTO news (title, slug, excerpt, content, featured_image, other_images, category_id,
                      status, view_count, read_time, meta_description, meta_keywords,
                      published_at, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_NEWS: &str = r#"
    UPDATE news
    SET title = ?, slug = ?, excerpt = ?, content = ?, featured_image = ?, other_images = ?,
        category_id = ?, status = ?, read_time = ?, meta_description = ?, meta_keywords = ?,
        published_at = ?, updated_at = ?
    WHERE id = ?
"#;

const INSERT_TAG_LINK: &str = "INSERT INTO news_tag_links (news_id, tag_id) VALUES (?, ?)";
const DELETE_TAG_LINKS: &str = "DELETE FROM news_tag_links WHERE news_id = ?";
const INSERT_CLASSIFICATION_LINK: &str =
    "INSERT INTO news_classification_links (news_id, classification_id) VALUES (?, ?)";
const DELETE_CLASSIFICATION_LINKS: &str =
    "DELETE FROM news_classification_links WHERE news_id = ?";

const SELECT_CATEGORY_REF: &str = "SELECT id, name FROM categories WHERE id = ?";
const SELECT_TAG_REFS: &str = r#"
    SELECT t.id, t.name FROM tags t
    INNER JOIN news_tag_links l ON l.tag_id = t.id
    WHERE l.news_id = ?
    ORDER BY t.name ASC, t.id ASC
"#;
const SELECT_CLASSIFICATION_REFS: &str = r#"
    SELECT c.id, c.name FROM news_classifications c
    INNER JOIN news_classification_links l ON l.classification_id = c.id
    WHERE l.news_id = ?
    ORDER BY c.priority ASC, c.id ASC
"#;

/// Tables a news article references by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedTable {
    Categories,
    Tags,
    Classifications,
}

impl RelatedTable {
    fn table(&self) -> &'static str {
        match self {
            RelatedTable::Categories => "categories",
            RelatedTable::Tags => "tags",
            RelatedTable::Classifications => "news_classifications",
        }
    }
}

/// Replacement link sets; `None` leaves the current links untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkChanges<'a> {
    pub tag_ids: Option<&'a [i64]>,
    pub classification_ids: Option<&'a [i64]>,
}

/// News repository trait
#[async_trait]
pub trait NewsRepository: Send + Sync {
    /// Insert an article and its links; returns the stored row
    async fn create(
        &self,
        news: &News,
        tag_ids: &[i64],
        classification_ids: &[i64],
    ) -> Result<News>;

    /// One page of articles plus the total matching count
    async fn list(&self, filters: &NewsFilters, params: &ListParams) -> Result<(Vec<News>, i64)>;

    async fn find_by_id(&self, id: i64) -> Result<Option<News>>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<News>>;

    /// Attach the category, tags and classifications of an article
    async fn load_detail(&self, news: News) -> Result<NewsDetail>;

    /// Persist every column of `news` and apply link changes.
    ///
    /// Returns `None` when the row no longer exists.
    async fn update(&self, news: &News, links: LinkChanges<'_>) -> Result<Option<News>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Increment the view counter; returns whether the row exists
    async fn increment_views(&self, id: i64) -> Result<bool>;

    /// Which of `ids` exist in `table`
    async fn existing_ids(&self, table: RelatedTable, ids: &[i64]) -> Result<Vec<i64>>;
}

/// SQLx-based news repository implementation
pub struct SqlxNewsRepository {
    pool: DynDatabasePool,
}

impl SqlxNewsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NewsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NewsRepository for SqlxNewsRepository {
    async fn create(
        &self,
        news: &News,
        tag_ids: &[i64],
        classification_ids: &[i64],
    ) -> Result<News> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                create_news_sqlite(pool, news, tag_ids, classification_ids).await
            }
            Backend::Mysql(pool) => create_news_mysql(pool, news, tag_ids, classification_ids).await,
        }
    }

    async fn list(&self, filters: &NewsFilters, params: &ListParams) -> Result<(Vec<News>, i64)> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => list_news_sqlite(pool, filters, params).await,
            Backend::Mysql(pool) => list_news_mysql(pool, filters, params).await,
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<News>> {
        let sql = format!("SELECT {} FROM news n WHERE n.id = ?", NEWS_COLUMNS);
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get news by ID")?;
                row.as_ref().map(row_to_news_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get news by ID")?;
                row.as_ref().map(row_to_news_mysql).transpose()
            }
        }
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<News>> {
        let sql = format!("SELECT {} FROM news n WHERE n.slug = ?", NEWS_COLUMNS);
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get news by slug")?;
                row.as_ref().map(row_to_news_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get news by slug")?;
                row.as_ref().map(row_to_news_mysql).transpose()
            }
        }
    }

    async fn load_detail(&self, news: News) -> Result<NewsDetail> {
        let (category, tags, classifications) = match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                let category = refs_sqlite(pool, SELECT_CATEGORY_REF, news.category_id).await?;
                let tags = refs_sqlite(pool, SELECT_TAG_REFS, news.id).await?;
                let classifications =
                    refs_sqlite(pool, SELECT_CLASSIFICATION_REFS, news.id).await?;
                (category, tags, classifications)
            }
            Backend::Mysql(pool) => {
                let category = refs_mysql(pool, SELECT_CATEGORY_REF, news.category_id).await?;
                let tags = refs_mysql(pool, SELECT_TAG_REFS, news.id).await?;
                let classifications = refs_mysql(pool, SELECT_CLASSIFICATION_REFS, news.id).await?;
                (category, tags, classifications)
            }
        };

        Ok(NewsDetail {
            news,
            category: category.into_iter().next(),
            tags,
            classifications,
        })
    }

    async fn update(&self, news: &News, links: LinkChanges<'_>) -> Result<Option<News>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => update_news_sqlite(pool, news, links).await?,
            Backend::Mysql(pool) => update_news_mysql(pool, news, links).await?,
        }
        self.find_by_id(news.id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query("DELETE FROM news WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete news")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query("DELETE FROM news WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete news")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn increment_views(&self, id: i64) -> Result<bool> {
        let sql = "UPDATE news SET view_count = view_count + 1 WHERE id = ?";
        let affected = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to record news view")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to record news view")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn existing_ids(&self, table: RelatedTable, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id FROM {} WHERE id IN ({})",
            table.table(),
            placeholders
        );

        match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                let mut q = sqlx::query_scalar::<_, i64>(&sql);
                for id in ids {
                    q = q.bind(id);
                }
                q.fetch_all(pool)
                    .await
                    .with_context(|| format!("Failed to look up ids in {}", table.table()))
            }
            Backend::Mysql(pool) => {
                let mut q = sqlx::query_scalar::<_, i64>(&sql);
                for id in ids {
                    q = q.bind(id);
                }
                q.fetch_all(pool)
                    .await
                    .with_context(|| format!("Failed to look up ids in {}", table.table()))
            }
        }
    }
}

/// A value bound to a news listing placeholder
#[derive(Debug, Clone, PartialEq)]
enum FilterValue {
    Text(String),
    Int(i64),
}

/// `WHERE` clause (possibly empty) and its bind values, in order
fn news_where(filters: &NewsFilters) -> (String, Vec<FilterValue>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(pattern) = filters.search_pattern() {
        conditions.push("LOWER(n.title) LIKE ? ESCAPE '!'");
        values.push(FilterValue::Text(pattern));
    }
    if let Some(status) = filters.status {
        conditions.push("n.status = ?");
        values.push(FilterValue::Text(status.as_str().to_string()));
    }
    if let Some(category_id) = filters.category_id {
        conditions.push("n.category_id = ?");
        values.push(FilterValue::Int(category_id));
    }
    if let Some(tag_id) = filters.tag_id {
        conditions.push(
            "EXISTS (SELECT 1 FROM news_tag_links tl WHERE tl.news_id = n.id AND tl.tag_id = ?)",
        );
        values.push(FilterValue::Int(tag_id));
    }
    if let Some(classification_id) = filters.classification_id {
        conditions.push(
            "EXISTS (SELECT 1 FROM news_classification_links cl \
             WHERE cl.news_id = n.id AND cl.classification_id = ?)",
        );
        values.push(FilterValue::Int(classification_id));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    (clause, values)
}

fn list_sql(where_clause: &str) -> (String, String) {
    let select = format!(
        "SELECT {} FROM news n{} \
         ORDER BY COALESCE(n.published_at, n.created_at) DESC, n.id DESC \
         LIMIT ? OFFSET ?",
        NEWS_COLUMNS, where_clause
    );
    let count = format!("SELECT COUNT(*) FROM news n{}", where_clause);
    (select, count)
}

fn encode_images(images: &[String]) -> Result<String> {
    serde_json::to_string(images).context("Failed to encode image list")
}

fn decode_images(raw: Option<String>) -> Result<Vec<String>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(raw).context("Invalid other_images JSON"),
    }
}

fn decode_status(raw: &str) -> Result<NewsStatus> {
    NewsStatus::parse(raw).with_context(|| format!("Unknown news status: {}", raw))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_news_sqlite(
    pool: &SqlitePool,
    news: &News,
    tag_ids: &[i64],
    classification_ids: &[i64],
) -> Result<News> {
    let now = Utc::now();
    let images = encode_images(&news.other_images)?;
    let mut tx = pool.begin().await.context("Failed to begin news insert")?;

    let result = sqlx::query(INSERT_NEWS)
        .bind(&news.title)
        .bind(&news.slug)
        .bind(&news.excerpt)
        .bind(&news.content)
        .bind(&news.featured_image)
        .bind(&images)
        .bind(news.category_id)
        .bind(news.status.as_str())
        .bind(news.read_time)
        .bind(&news.meta_description)
        .bind(&news.meta_keywords)
        .bind(news.published_at)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create news")?;
    let id = result.last_insert_rowid();

    for tag_id in tag_ids {
        sqlx::query(INSERT_TAG_LINK)
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link tag")?;
    }
    for classification_id in classification_ids {
        sqlx::query(INSERT_CLASSIFICATION_LINK)
            .bind(id)
            .bind(classification_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link classification")?;
    }

    tx.commit().await.context("Failed to commit news insert")?;

    Ok(News {
        id,
        view_count: 0,
        created_at: now,
        updated_at: now,
        ..news.clone()
    })
}

async fn list_news_sqlite(
    pool: &SqlitePool,
    filters: &NewsFilters,
    params: &ListParams,
) -> Result<(Vec<News>, i64)> {
    let (where_clause, values) = news_where(filters);
    let (select_sql, count_sql) = list_sql(&where_clause);

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    let mut select_query = sqlx::query(&select_sql);
    for value in &values {
        match value {
            FilterValue::Text(text) => {
                count_query = count_query.bind(text);
                select_query = select_query.bind(text);
            }
            FilterValue::Int(int) => {
                count_query = count_query.bind(*int);
                select_query = select_query.bind(*int);
            }
        }
    }

    let total = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count news")?;
    let rows = select_query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list news")?;

    let items = rows
        .iter()
        .map(row_to_news_sqlite)
        .collect::<Result<Vec<_>>>()?;
    Ok((items, total))
}

async fn update_news_sqlite(pool: &SqlitePool, news: &News, links: LinkChanges<'_>) -> Result<()> {
    let images = encode_images(&news.other_images)?;
    let mut tx = pool.begin().await.context("Failed to begin news update")?;

    sqlx::query(UPDATE_NEWS)
        .bind(&news.title)
        .bind(&news.slug)
        .bind(&news.excerpt)
        .bind(&news.content)
        .bind(&news.featured_image)
        .bind(&images)
        .bind(news.category_id)
        .bind(news.status.as_str())
        .bind(news.read_time)
        .bind(&news.meta_description)
        .bind(&news.meta_keywords)
        .bind(news.published_at)
        .bind(Utc::now())
        .bind(news.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update news")?;

    if let Some(tag_ids) = links.tag_ids {
        sqlx::query(DELETE_TAG_LINKS)
            .bind(news.id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear tag links")?;
        for tag_id in tag_ids {
            sqlx::query(INSERT_TAG_LINK)
                .bind(news.id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await
                .context("Failed to link tag")?;
        }
    }
    if let Some(classification_ids) = links.classification_ids {
        sqlx::query(DELETE_CLASSIFICATION_LINKS)
            .bind(news.id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear classification links")?;
        for classification_id in classification_ids {
            sqlx::query(INSERT_CLASSIFICATION_LINK)
                .bind(news.id)
                .bind(classification_id)
                .execute(&mut *tx)
                .await
                .context("Failed to link classification")?;
        }
    }

    tx.commit().await.context("Failed to commit news update")?;
    Ok(())
}

async fn refs_sqlite(pool: &SqlitePool, sql: &str, id: i64) -> Result<Vec<EntityRef>> {
    let rows = sqlx::query(sql)
        .bind(id)
        .fetch_all(pool)
        .await
        .context("Failed to load related entities")?;

    rows.iter()
        .map(|row| {
            Ok(EntityRef {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            })
        })
        .collect()
}

fn row_to_news_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<News> {
    let status: String = row.try_get("status")?;
    Ok(News {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        excerpt: row.try_get("excerpt")?,
        content: row.try_get("content")?,
        featured_image: row.try_get("featured_image")?,
        other_images: decode_images(row.try_get("other_images")?)?,
        category_id: row.try_get("category_id")?,
        status: decode_status(&status)?,
        view_count: row.try_get("view_count")?,
        read_time: row.try_get("read_time")?,
        meta_description: row.try_get("meta_description")?,
        meta_keywords: row.try_get("meta_keywords")?,
        published_at: row.try_get("published_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_news_mysql(
    pool: &MySqlPool,
    news: &News,
    tag_ids: &[i64],
    classification_ids: &[i64],
) -> Result<News> {
    let now = Utc::now();
    let images = encode_images(&news.other_images)?;
    let mut tx = pool.begin().await.context("Failed to begin news insert")?;

    let result = sqlx::query(INSERT_NEWS)
        .bind(&news.title)
        .bind(&news.slug)
        .bind(&news.excerpt)
        .bind(&news.content)
        .bind(&news.featured_image)
        .bind(&images)
        .bind(news.category_id)
        .bind(news.status.as_str())
        .bind(news.read_time)
        .bind(&news.meta_description)
        .bind(&news.meta_keywords)
        .bind(news.published_at)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create news")?;
    let id = result.last_insert_id() as i64;

    for tag_id in tag_ids {
        sqlx::query(INSERT_TAG_LINK)
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link tag")?;
    }
    for classification_id in classification_ids {
        sqlx::query(INSERT_CLASSIFICATION_LINK)
            .bind(id)
            .bind(classification_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link classification")?;
    }

    tx.commit().await.context("Failed to commit news insert")?;

    Ok(News {
        id,
        view_count: 0,
        created_at: now,
        updated_at: now,
        ..news.clone()
    })
}

async fn list_news_mysql(
    pool: &MySqlPool,
    filters: &NewsFilters,
    params: &ListParams,
) -> Result<(Vec<News>, i64)> {
    let (where_clause, values) = news_where(filters);
    let (select_sql, count_sql) = list_sql(&where_clause);

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    let mut select_query = sqlx::query(&select_sql);
    for value in &values {
        match value {
            FilterValue::Text(text) => {
                count_query = count_query.bind(text);
                select_query = select_query.bind(text);
            }
            FilterValue::Int(int) => {
                count_query = count_query.bind(*int);
                select_query = select_query.bind(*int);
            }
        }
    }

    let total = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count news")?;
    let rows = select_query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list news")?;

    let items = rows
        .iter()
        .map(row_to_news_mysql)
        .collect::<Result<Vec<_>>>()?;
    Ok((items, total))
}

async fn update_news_mysql(pool: &MySqlPool, news: &News, links: LinkChanges<'_>) -> Result<()> {
    let images = encode_images(&news.other_images)?;
    let mut tx = pool.begin().await.context("Failed to begin news update")?;

    sqlx::query(UPDATE_NEWS)
        .bind(&news.title)
        .bind(&news.slug)
        .bind(&news.excerpt)
        .bind(&news.content)
        .bind(&news.featured_image)
        .bind(&images)
        .bind(news.category_id)
        .bind(news.status.as_str())
        .bind(news.read_time)
        .bind(&news.meta_description)
        .bind(&news.meta_keywords)
        .bind(news.published_at)
        .bind(Utc::now())
        .bind(news.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update news")?;

    if let Some(tag_ids) = links.tag_ids {
        sqlx::query(DELETE_TAG_LINKS)
            .bind(news.id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear tag links")?;
        for tag_id in tag_ids {
            sqlx::query(INSERT_TAG_LINK)
                .bind(news.id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await
                .context("Failed to link tag")?;
        }
    }
    if let Some(classification_ids) = links.classification_ids {
        sqlx::query(DELETE_CLASSIFICATION_LINKS)
            .bind(news.id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear classification links")?;
        for classification_id in classification_ids {
            sqlx::query(INSERT_CLASSIFICATION_LINK)
                .bind(news.id)
                .bind(classification_id)
                .execute(&mut *tx)
                .await
                .context("Failed to link classification")?;
        }
    }

    tx.commit().await.context("Failed to commit news update")?;
    Ok(())
}

async fn refs_mysql(pool: &MySqlPool, sql: &str, id: i64) -> Result<Vec<EntityRef>> {
    let rows = sqlx::query(sql)
        .bind(id)
        .fetch_all(pool)
        .await
        .context("Failed to load related entities")?;

    rows.iter()
        .map(|row| {
            Ok(EntityRef {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            })
        })
        .collect()
}

fn row_to_news_mysql(row: &sqlx::mysql::MySqlRow) -> Result<News> {
    let status: String = row.try_get("status")?;
    Ok(News {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        excerpt: row.try_get("excerpt")?,
        content: row.try_get("content")?,
        featured_image: row.try_get("featured_image")?,
        other_images: decode_images(row.try_get("other_images")?)?,
        category_id: row.try_get("category_id")?,
        status: decode_status(&status)?,
        view_count: row.try_get("view_count")?,
        read_time: row.try_get("read_time")?,
        meta_description: row.try_get("meta_description")?,
        meta_keywords: row.try_get("meta_keywords")?,
        published_at: row.try_get("published_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxNewsRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query("INSERT INTO categories (id, name) VALUES (1, 'Events'), (2, 'Results')")
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query("INSERT INTO tags (id, name) VALUES (1, 'Swimming'), (2, 'Athletics')")
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO news_classifications (id, name, priority) VALUES (1, 'Featured', 1)",
        )
        .execute(sqlite)
        .await
        .unwrap();
        let repo = SqlxNewsRepository::new(pool.clone());
        (pool, repo)
    }

    fn sample_news(slug: &str, category_id: i64) -> News {
        let now = Utc::now();
        News {
            id: 0,
            title: format!("Title {}", slug),
            slug: slug.to_string(),
            excerpt: None,
            content: "Body text".to_string(),
            featured_image: None,
            other_images: vec!["/uploads/x.png".to_string()],
            category_id,
            status: NewsStatus::Draft,
            view_count: 0,
            read_time: Some(1),
            meta_description: None,
            meta_keywords: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_with_links_and_load_detail() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo
            .create(&sample_news("relay-final", 1), &[1, 2], &[1])
            .await
            .unwrap();
        let stored = repo.find_by_slug("relay-final").await.unwrap().unwrap();
        assert_eq!(stored.id, created.id);
        assert_eq!(stored.other_images, vec!["/uploads/x.png".to_string()]);

        let detail = repo.load_detail(stored).await.unwrap();
        assert_eq!(detail.category.unwrap().name, "Events");
        let tag_names: Vec<_> = detail.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tag_names, vec!["Athletics", "Swimming"]);
        assert_eq!(detail.classifications.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_link_rolls_back_article() {
        let (_pool, repo) = setup_test_repo().await;

        let result = repo.create(&sample_news("orphan", 1), &[999], &[]).await;
        assert!(result.is_err());
        assert!(repo.find_by_slug("orphan").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_pagination() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&sample_news("a", 1), &[1], &[]).await.unwrap();
        repo.create(&sample_news("b", 1), &[2], &[1]).await.unwrap();
        repo.create(&sample_news("c", 2), &[1], &[]).await.unwrap();

        let (all, total) = repo
            .list(&NewsFilters::default(), &ListParams::new(1, 2))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].slug, "c");

        let by_tag = NewsFilters {
            tag_id: Some(1),
            category_id: Some(1),
            ..Default::default()
        };
        let (items, total) = repo.list(&by_tag, &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].slug, "a");

        let by_classification = NewsFilters {
            classification_id: Some(1),
            search: Some("TITLE B".to_string()),
            ..Default::default()
        };
        let (items, _) = repo
            .list(&by_classification, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].slug, "b");
    }

    #[tokio::test]
    async fn test_update_replaces_links() {
        let (_pool, repo) = setup_test_repo().await;
        let mut news = repo.create(&sample_news("swap", 1), &[1], &[1]).await.unwrap();

        news.title = "Swapped".to_string();
        let tags = [2];
        let updated = repo
            .update(
                &news,
                LinkChanges {
                    tag_ids: Some(&tags),
                    classification_ids: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Swapped");

        let detail = repo.load_detail(updated).await.unwrap();
        assert_eq!(detail.tags.len(), 1);
        assert_eq!(detail.tags[0].id, 2);
        assert_eq!(detail.classifications.len(), 1);
    }

    #[tokio::test]
    async fn test_views_delete_and_existing_ids() {
        let (_pool, repo) = setup_test_repo().await;
        let news = repo.create(&sample_news("count", 1), &[], &[]).await.unwrap();

        assert!(repo.increment_views(news.id).await.unwrap());
        assert!(repo.increment_views(news.id).await.unwrap());
        assert_eq!(repo.find_by_id(news.id).await.unwrap().unwrap().view_count, 2);

        let existing = repo
            .existing_ids(RelatedTable::Tags, &[1, 2, 3])
            .await
            .unwrap();
        assert_eq!(existing.len(), 2);
        assert!(repo
            .existing_ids(RelatedTable::Categories, &[])
            .await
            .unwrap()
            .is_empty());

        assert!(repo.delete(news.id).await.unwrap());
        assert!(!repo.increment_views(news.id).await.unwrap());
    }

    #[test]
    fn test_news_where_orders_values() {
        let filters = NewsFilters {
            search: Some("Gold".to_string()),
            status: Some(NewsStatus::Published),
            tag_id: Some(7),
            ..Default::default()
        };
        let (clause, values) = news_where(&filters);

        assert!(clause.starts_with(" WHERE LOWER(n.title) LIKE ?"));
        assert_eq!(
            values,
            vec![
                FilterValue::Text("%gold%".to_string()),
                FilterValue::Text("published".to_string()),
                FilterValue::Int(7),
            ]
        );
        assert_eq!(news_where(&NewsFilters::default()).0, "");
    }
}
