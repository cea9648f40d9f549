//! Database repositories
//!
//! One repository per entity. Each exposes a trait used by the services and a
//! `Sqlx*Repository` implementation that dispatches to SQLite or MySQL.
//!
//! Tags, categories and classifications share the same listing shape (name
//! search, `is_active` filter, article counts, whitelisted sort columns), so
//! their SQL is assembled by [`TaxonomySql`].

pub mod category;
pub mod classification;
pub mod news;
pub mod tag;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use classification::{ClassificationRepository, SqlxClassificationRepository};
pub use news::{NewsRepository, SqlxNewsRepository};
pub use tag::{SqlxTagRepository, TagRepository};

use anyhow::{Context, Result};
use sqlx::{MySqlPool, SqlitePool};

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{EntityFilters, SortField, SortOrder};

/// Concrete pool behind a [`DynDatabasePool`]
pub(crate) enum Backend<'a> {
    Sqlite(&'a SqlitePool),
    Mysql(&'a MySqlPool),
}

pub(crate) fn backend(pool: &DynDatabasePool) -> Result<Backend<'_>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => pool
            .as_sqlite()
            .map(Backend::Sqlite)
            .context("SQLite driver configured without a SQLite pool"),
        DatabaseDriver::Mysql => pool
            .as_mysql()
            .map(Backend::Mysql)
            .context("MySQL driver configured without a MySQL pool"),
    }
}

/// Whitelisted sort columns of one table plus its default ordering
#[derive(Debug, Clone, Copy)]
pub(crate) struct SortRules {
    pub columns: &'static [(SortField, &'static str)],
    pub default_field: SortField,
    pub default_order: SortOrder,
}

impl SortRules {
    /// SQL expression and direction for the requested ordering.
    ///
    /// Unsupported fields fall back to the default field; a missing
    /// direction falls back to the default direction.
    pub fn resolve(&self, filters: &EntityFilters) -> (&'static str, SortOrder) {
        let order = filters.sort_order.unwrap_or(self.default_order);
        let column = filters
            .sort_by
            .and_then(|field| self.column_for(field))
            .or_else(|| self.column_for(self.default_field))
            .unwrap_or("e.id");
        (column, order)
    }

    fn column_for(&self, field: SortField) -> Option<&'static str> {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, column)| *column)
    }
}

/// A listing statement and the values to bind, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ListQuery {
    pub sql: String,
    pub search_pattern: Option<String>,
    pub is_active: Option<bool>,
}

/// SQL shared by the taxonomy tables.
///
/// The entity table is aliased `e`; `count_join` must join the table holding
/// the article references and `count_expr` count them.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TaxonomySql {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub count_join: &'static str,
    pub count_expr: &'static str,
    pub sort: SortRules,
}

impl TaxonomySql {
    fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("e.{}", c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn select_with_count(&self) -> String {
        format!(
            "SELECT {}, {} AS article_count FROM {} e {}",
            self.column_list(),
            self.count_expr,
            self.table,
            self.count_join
        )
    }

    /// Listing with optional name search and `is_active` filter
    pub fn list(&self, filters: &EntityFilters) -> ListQuery {
        let search_pattern = filters.search_pattern();
        let mut conditions = Vec::new();
        if search_pattern.is_some() {
            conditions.push("LOWER(e.name) LIKE ? ESCAPE '!'");
        }
        if filters.is_active.is_some() {
            conditions.push("e.is_active = ?");
        }

        let mut sql = self.select_with_count();
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        let (column, order) = self.sort.resolve(filters);
        sql.push_str(&format!(
            " GROUP BY {} ORDER BY {} {}, e.id {}",
            self.column_list(),
            column,
            order.as_sql(),
            order.as_sql()
        ));

        ListQuery {
            sql,
            search_pattern,
            is_active: filters.is_active,
        }
    }

    /// Single row with its article count
    pub fn by_id(&self) -> String {
        format!(
            "{} WHERE e.id = ? GROUP BY {}",
            self.select_with_count(),
            self.column_list()
        )
    }

    /// Plain row lookup by exact name
    pub fn by_name(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE name = ?",
            self.columns.join(", "),
            self.table
        )
    }

    /// Plain row lookup by id
    pub fn plain_by_id(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE id = ?",
            self.columns.join(", "),
            self.table
        )
    }

    /// Flip `is_active` in one statement; binds `updated_at` then `id`
    pub fn toggle(&self) -> String {
        format!(
            "UPDATE {} SET is_active = NOT is_active, updated_at = ? WHERE id = ?",
            self.table
        )
    }

    pub fn stats(&self) -> String {
        format!(
            "SELECT is_active, COUNT(*) AS count FROM {} GROUP BY is_active",
            self.table
        )
    }

    pub fn delete(&self) -> String {
        format!("DELETE FROM {} WHERE id = ?", self.table)
    }
}
