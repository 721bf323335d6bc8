//! Database layer
//!
//! SQLite pool, embedded migrations and one repository per entity.
//!
//! ```ignore
//! use marketwire::config::DatabaseConfig;
//! use marketwire::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool, SqliteDatabase};

/// True when the error is a SQLite UNIQUE constraint violation.
///
/// Services use this to map races past their pre-checks onto duplicate errors.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation())
            .unwrap_or(false)
    })
}
