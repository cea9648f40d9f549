//! Database layer
//!
//! Connection pooling over SQLite (default) or MySQL, embedded migrations and
//! one repository per table family.
//!
//! ```ignore
//! use paranews::config::DatabaseConfig;
//! use paranews::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, is_unique_violation, DatabasePool, DynDatabasePool,
    MysqlDatabase, SqliteDatabase,
};
