//! Database migrations
//!
//! Migrations are embedded in the binary as SQL for both SQLite and MySQL and
//! tracked in the `_migrations` table. `run_migrations` is idempotent.

use anyhow::{Context, Result};
use std::collections::BTreeSet;

use super::repositories::{backend, Backend};
use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// One schema step, written once per dialect
#[derive(Debug, Clone)]
pub struct Migration {
    /// Ascending, never reused
    pub version: i32,
    pub name: &'static str,
    pub up_sqlite: &'static str,
    pub up_mysql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_tags",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(50) NOT NULL UNIQUE,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_tags_is_active ON tags(is_active);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS tags (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(50) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL UNIQUE,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_tags_is_active ON tags(is_active);
        "#,
    },
    Migration {
        version: 2,
        name: "create_categories",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                description TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_categories_is_active ON categories(is_active);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL UNIQUE,
                description TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_categories_is_active ON categories(is_active);
        "#,
    },
    Migration {
        version: 3,
        name: "create_news_classifications",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS news_classifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(50) NOT NULL UNIQUE,
                priority INTEGER NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_news_classifications_priority ON news_classifications(priority);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS news_classifications (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(50) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL UNIQUE,
                priority INT NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_news_classifications_priority ON news_classifications(priority);
        "#,
    },
    Migration {
        version: 4,
        name: "create_news",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS news (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                excerpt TEXT,
                content TEXT NOT NULL,
                featured_image VARCHAR(255),
                other_images TEXT NOT NULL DEFAULT '[]',
                category_id INTEGER NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                view_count INTEGER NOT NULL DEFAULT 0,
                read_time INTEGER,
                meta_description TEXT,
                meta_keywords TEXT,
                published_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE RESTRICT
            );
            CREATE INDEX IF NOT EXISTS idx_news_category_id ON news(category_id);
            CREATE INDEX IF NOT EXISTS idx_news_status ON news(status);
            CREATE INDEX IF NOT EXISTS idx_news_published_at ON news(published_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS news (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL UNIQUE,
                excerpt TEXT,
                content LONGTEXT NOT NULL,
                featured_image VARCHAR(255),
                other_images TEXT NOT NULL,
                category_id BIGINT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                view_count BIGINT NOT NULL DEFAULT 0,
                read_time INT,
                meta_description TEXT,
                meta_keywords TEXT,
                published_at TIMESTAMP NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE RESTRICT
            );
            CREATE INDEX idx_news_category_id ON news(category_id);
            CREATE INDEX idx_news_status ON news(status);
            CREATE INDEX idx_news_published_at ON news(published_at);
        "#,
    },
    Migration {
        version: 5,
        name: "create_news_links",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS news_tag_links (
                news_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                UNIQUE (news_id, tag_id),
                FOREIGN KEY (news_id) REFERENCES news(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_news_tag_links_tag_id ON news_tag_links(tag_id);
            CREATE TABLE IF NOT EXISTS news_classification_links (
                news_id INTEGER NOT NULL,
                classification_id INTEGER NOT NULL,
                UNIQUE (news_id, classification_id),
                FOREIGN KEY (news_id) REFERENCES news(id) ON DELETE CASCADE,
                FOREIGN KEY (classification_id) REFERENCES news_classifications(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_news_classification_links_cid ON news_classification_links(classification_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS news_tag_links (
                news_id BIGINT NOT NULL,
                tag_id BIGINT NOT NULL,
                UNIQUE KEY uq_news_tag (news_id, tag_id),
                FOREIGN KEY (news_id) REFERENCES news(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_news_tag_links_tag_id ON news_tag_links(tag_id);
            CREATE TABLE IF NOT EXISTS news_classification_links (
                news_id BIGINT NOT NULL,
                classification_id BIGINT NOT NULL,
                UNIQUE KEY uq_news_classification (news_id, classification_id),
                FOREIGN KEY (news_id) REFERENCES news(id) ON DELETE CASCADE,
                FOREIGN KEY (classification_id) REFERENCES news_classifications(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_news_classification_links_cid ON news_classification_links(classification_id);
        "#,
    },
];

/// Bookkeeping table, one row per applied version
const LEDGER_SQLITE: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

const LEDGER_MYSQL: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version INT PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

impl Migration {
    fn sql_for(&self, driver: DatabaseDriver) -> &'static str {
        match driver {
            DatabaseDriver::Sqlite => self.up_sqlite,
            DatabaseDriver::Mysql => self.up_mysql,
        }
    }

    /// Statements of this migration, with comment-only fragments dropped
    fn statements(&self, driver: DatabaseDriver) -> Vec<&'static str> {
        split_sql_statements(self.sql_for(driver))
    }
}

/// Apply every pending migration in version order.
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    let pending = pending_migrations(pool).await?;
    if pending.is_empty() {
        tracing::debug!("Schema is up to date");
        return Ok(0);
    }

    for migration in &pending {
        tracing::info!("Migrating to v{} ({})", migration.version, migration.name);
        apply(pool, migration)
            .await
            .with_context(|| format!("Migration v{} ({}) failed", migration.version, migration.name))?;
    }

    tracing::info!("Applied {} migration(s)", pending.len());
    Ok(pending.len())
}

/// Migrations not yet recorded in the ledger, lowest version first
pub async fn pending_migrations(pool: &DynDatabasePool) -> Result<Vec<&'static Migration>> {
    let ledger = match pool.driver() {
        DatabaseDriver::Sqlite => LEDGER_SQLITE,
        DatabaseDriver::Mysql => LEDGER_MYSQL,
    };
    pool.execute(ledger).await?;

    let applied = applied_versions(pool).await?;
    Ok(MIGRATIONS
        .iter()
        .filter(|migration| !applied.contains(&migration.version))
        .collect())
}

/// Number of migrations still to apply
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    Ok(pending_migrations(pool).await?.len())
}

/// Whether every embedded migration has been applied
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    Ok(pending_count(pool).await? == 0)
}

async fn applied_versions(pool: &DynDatabasePool) -> Result<BTreeSet<i32>> {
    const QUERY: &str = "SELECT version FROM _migrations";

    let versions = match backend(pool)? {
        Backend::Sqlite(p) => sqlx::query_scalar::<_, i64>(QUERY)
            .fetch_all(p)
            .await?
            .into_iter()
            .map(|v| v as i32)
            .collect(),
        Backend::Mysql(p) => sqlx::query_scalar::<_, i32>(QUERY)
            .fetch_all(p)
            .await?
            .into_iter()
            .collect(),
    };
    Ok(versions)
}

async fn apply(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    for statement in migration.statements(pool.driver()) {
        pool.execute(statement)
            .await
            .with_context(|| format!("Statement failed: {}", preview(statement)))?;
    }

    // Names are compile-time constants without quotes
    pool.execute(&format!(
        "INSERT INTO _migrations (version, name) VALUES ({}, '{}')",
        migration.version, migration.name
    ))
    .await?;
    Ok(())
}

/// First line of a statement, shortened for error messages
fn preview(sql: &str) -> String {
    let line = sql.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
    match line.char_indices().nth(80) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}

fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|chunk| {
            chunk
                .lines()
                .map(str::trim)
                .any(|line| !line.is_empty() && !line.starts_with("--"))
        })
        .collect()
}
