//! Navigation tab repository

use crate::db::DynDatabasePool;
use crate::models::Tab;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait TabRepository: Send + Sync {
    async fn create(&self, tab: &Tab) -> Result<Tab>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Tab>>;

    /// Tabs by sort order; only enabled ones when `active_only`
    async fn list(&self, active_only: bool) -> Result<Vec<Tab>>;

    async fn exists_by_name(&self, name: &str, exclude_id: Option<i64>) -> Result<bool>;

    async fn update(&self, tab: &Tab) -> Result<Tab>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxTabRepository {
    pool: DynDatabasePool,
}

impl SqlxTabRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TabRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TabRepository for SqlxTabRepository {
    async fn create(&self, tab: &Tab) -> Result<Tab> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO tabs (name, status, sort_order, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&tab.name)
        .bind(tab.status)
        .bind(tab.sort_order)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create tab")?;

        Ok(Tab {
            id: result.last_insert_rowid(),
            created_at: now,
            updated_at: now,
            ..tab.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tab>> {
        get_tab_by_id(self.pool.sqlite(), id).await
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Tab>> {
        let sql = if active_only {
            "SELECT * FROM tabs WHERE status = 1 ORDER BY sort_order ASC, name ASC"
        } else {
            "SELECT * FROM tabs ORDER BY sort_order ASC, name ASC"
        };
        let rows = sqlx::query(sql)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list tabs")?;
        Ok(rows.iter().map(row_to_tab).collect())
    }

    async fn exists_by_name(&self, name: &str, exclude_id: Option<i64>) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM tabs WHERE name = ? AND id != ?")
            .bind(name.trim())
            .bind(exclude_id.unwrap_or(0))
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to check tab name")?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn update(&self, tab: &Tab) -> Result<Tab> {
        sqlx::query("UPDATE tabs SET name = ?, status = ?, sort_order = ?, updated_at = ? WHERE id = ?")
            .bind(&tab.name)
            .bind(tab.status)
            .bind(tab.sort_order)
            .bind(Utc::now())
            .bind(tab.id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update tab")?;

        get_tab_by_id(self.pool.sqlite(), tab.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Tab not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tabs WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete tab")?;
        Ok(result.rows_affected() > 0)
    }
}

async fn get_tab_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Tab>> {
    let row = sqlx::query("SELECT * FROM tabs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tab by ID")?;
    Ok(row.as_ref().map(row_to_tab))
}

fn row_to_tab(row: &sqlx::sqlite::SqliteRow) -> Tab {
    Tab {
        id: row.get("id"),
        name: row.get("name"),
        status: row.get("status"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    fn tab(name: &str, status: bool, sort_order: i64) -> Tab {
        let now = Utc::now();
        Tab {
            id: 0,
            name: name.into(),
            status,
            sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_tab_crud() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxTabRepository::new(pool);

        let home = repo.create(&tab("Home", true, 1)).await.unwrap();
        repo.create(&tab("Deals", true, 0)).await.unwrap();
        repo.create(&tab("Draft", false, 2)).await.unwrap();

        let names: Vec<String> = repo.list(true).await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Deals", "Home"]);
        assert_eq!(repo.list(false).await.unwrap().len(), 3);
        assert!(repo.exists_by_name("HOME", None).await.unwrap());

        let mut renamed = home.clone();
        renamed.name = "Start".into();
        assert_eq!(repo.update(&renamed).await.unwrap().name, "Start");
        assert!(repo.delete(home.id).await.unwrap());
        assert!(repo.get_by_id(home.id).await.unwrap().is_none());
    }
}
