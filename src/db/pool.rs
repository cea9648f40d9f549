//! Database connection pool abstraction
//!
//! Repositories talk to the database through [`DatabasePool`], so the same
//! service code runs against SQLite (default) or MySQL. The pool is created
//! once at startup and shared as a [`DynDatabasePool`] handle.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DatabaseConfig, DatabaseDriver};

/// Unified interface over the supported database backends.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run a statement that returns no rows; yields the affected row count
    async fn execute(&self, query: &str) -> Result<u64>;

    /// Round-trip a trivial query
    async fn ping(&self) -> Result<()>;

    async fn close(&self);

    fn driver(&self) -> DatabaseDriver;

    fn as_sqlite(&self) -> Option<&SqlitePool>;

    fn as_mysql(&self) -> Option<&MySqlPool>;
}

/// Shared, read-only handle to the process-wide pool
pub type DynDatabasePool = Arc<dyn DatabasePool>;

// ============================================================================
// SQLite
// ============================================================================

/// Where a SQLite URL points
#[derive(Debug, Clone, PartialEq, Eq)]
enum SqliteTarget {
    Memory,
    File {
        /// Database file, used to create missing parent directories
        path: PathBuf,
        /// URL handed to sqlx, with `mode=rwc` unless the caller set a mode
        url: String,
    },
}

impl SqliteTarget {
    /// Accepts bare paths (`data/paranews.db`), `sqlite:` URLs and the
    /// usual in-memory spellings.
    fn parse(url: &str) -> Self {
        let url = url.trim();
        if url == ":memory:" || url.starts_with("sqlite::memory:") || url.contains("mode=memory")
        {
            return Self::Memory;
        }

        let rest = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"));
        let location = rest.unwrap_or(url);
        let (path, query) = match location.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (location, None),
        };

        let url = match query {
            Some(query) if query.contains("mode=") => format!("sqlite:{}?{}", path, query),
            Some(query) => format!("sqlite:{}?{}&mode=rwc", path, query),
            None => format!("sqlite:{}?mode=rwc", path),
        };
        Self::File {
            path: PathBuf::from(path),
            url,
        }
    }
}

/// SQLite connection pool implementation
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (and create if needed) a SQLite database with foreign keys on.
    ///
    /// An in-memory database lives only as long as its connection, so it gets
    /// a single connection that is never recycled.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let (options, url) = match SqliteTarget::parse(&config.url) {
            SqliteTarget::Memory => (
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None::<Duration>)
                    .max_lifetime(None::<Duration>),
                "sqlite::memory:".to_string(),
            ),
            SqliteTarget::File { path, url } => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory: {:?}", parent)
                    })?;
                }
                (
                    SqlitePoolOptions::new().max_connections(config.pool_size()),
                    url,
                )
            }
        };

        let pool = options
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON")
                        .execute(conn)
                        .await
                        .map(|_| ())
                })
            })
            .connect(&url)
            .await
            .with_context(|| format!("Failed to open SQLite database: {}", config.url))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected())
            .with_context(|| format!("Failed to execute statement: {}", query))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("SQLite ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

// ============================================================================
// MySQL
// ============================================================================

/// MySQL connection pool implementation
pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    /// Connect to MySQL; a URL without a scheme gets `mysql://` prepended.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = if config.url.starts_with("mysql://") {
            config.url.clone()
        } else {
            format!("mysql://{}", config.url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_size())
            .connect(&url)
            .await
            .context("Failed to connect to MySQL database")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected())
            .with_context(|| format!("Failed to execute statement: {}", query))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("MySQL ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

// ============================================================================
// Construction and helpers
// ============================================================================

/// Create the pool for the configured driver.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    Ok(match config.driver {
        DatabaseDriver::Sqlite => Arc::new(SqliteDatabase::connect(config).await?),
        DatabaseDriver::Mysql => Arc::new(MysqlDatabase::connect(config).await?),
    })
}

/// In-memory SQLite pool for tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
        max_connections: None,
    })
    .await
}

/// Whether an error chain contains a unique-constraint violation reported by
/// the database.
///
/// Services check for duplicates before writing, but two concurrent requests
/// can both pass that check; the unique index then rejects the second write.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| match cause.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_target_parse() {
        assert_eq!(SqliteTarget::parse(":memory:"), SqliteTarget::Memory);
        assert_eq!(SqliteTarget::parse("sqlite::memory:"), SqliteTarget::Memory);
        assert_eq!(
            SqliteTarget::parse("sqlite:file:test?mode=memory&cache=shared"),
            SqliteTarget::Memory
        );

        assert_eq!(
            SqliteTarget::parse("data/paranews.db"),
            SqliteTarget::File {
                path: PathBuf::from("data/paranews.db"),
                url: "sqlite:data/paranews.db?mode=rwc".to_string(),
            }
        );
        assert_eq!(
            SqliteTarget::parse("sqlite://db/news.db?cache=shared"),
            SqliteTarget::File {
                path: PathBuf::from("db/news.db"),
                url: "sqlite:db/news.db?cache=shared&mode=rwc".to_string(),
            }
        );
        assert_eq!(
            SqliteTarget::parse("sqlite:news.db?mode=ro"),
            SqliteTarget::File {
                path: PathBuf::from("news.db"),
                url: "sqlite:news.db?mode=ro".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_memory_pool() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_sqlite().is_some());
        assert!(pool.as_mysql().is_none());
        pool.ping().await.expect("Ping should succeed");

        // One connection, so the table survives between statements
        pool.execute("CREATE TABLE sample (id INTEGER PRIMARY KEY, name TEXT UNIQUE)")
            .await
            .expect("Failed to create table");
        let affected = pool
            .execute("INSERT INTO sample (name) VALUES ('athletics')")
            .await
            .expect("Failed to insert");
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_file_pool_creates_directories_and_enforces_foreign_keys() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("nested").join("dir").join("news.db");

        let pool = create_pool(&DatabaseConfig {
            url: db_path.to_string_lossy().to_string(),
            max_connections: Some(2),
            ..DatabaseConfig::default()
        })
        .await
        .expect("Failed to create pool");
        assert!(db_path.exists());

        pool.execute("CREATE TABLE parent (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        pool.execute("CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id))")
            .await
            .unwrap();
        assert!(pool
            .execute("INSERT INTO child (parent_id) VALUES (7)")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_is_unique_violation_detects_constraint() {
        let pool = create_test_pool().await.expect("Failed to create pool");

        pool.execute("CREATE TABLE sample (id INTEGER PRIMARY KEY, name TEXT UNIQUE)")
            .await
            .unwrap();
        pool.execute("INSERT INTO sample (name) VALUES ('swimming')")
            .await
            .unwrap();

        let err = pool
            .execute("INSERT INTO sample (name) VALUES ('swimming')")
            .await
            .unwrap_err()
            .context("Failed to insert sample");

        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&anyhow::anyhow!("unrelated")));
    }

    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool_ping() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/test".to_string());

        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
            max_connections: Some(2),
        })
        .await
        .expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        pool.ping().await.expect("Ping should succeed");
    }
}
