//! Named sequence counters

use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Sequence used for banner ids
pub const BANNER_ID_SEQUENCE: &str = "bannerId";

#[async_trait]
pub trait CounterRepository: Send + Sync {
    /// Atomically increment the named sequence and return the new value.
    ///
    /// A sequence that does not exist yet starts at 1.
    async fn next_value(&self, name: &str) -> Result<i64>;
}

pub struct SqlxCounterRepository {
    pool: DynDatabasePool,
}

impl SqlxCounterRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CounterRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CounterRepository for SqlxCounterRepository {
    async fn next_value(&self, name: &str) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO counters (name, value) VALUES (?, 1)
            ON CONFLICT(name) DO UPDATE SET value = value + 1
            RETURNING value
            "#,
        )
        .bind(name)
        .fetch_one(self.pool.sqlite())
        .await
        .with_context(|| format!("Failed to advance counter {}", name))?;
        Ok(row.get("value"))
    }
}
