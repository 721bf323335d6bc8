//! Minicategory repository

use crate::db::DynDatabasePool;
use crate::models::MiniCategory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait MiniCategoryRepository: Send + Sync {
    async fn create(&self, mini: &MiniCategory) -> Result<MiniCategory>;

    async fn get_by_id(&self, id: i64) -> Result<Option<MiniCategory>>;

    /// Find by `(name, category, sub_category)`, ignoring case
    async fn find(&self, name: &str, category: &str, sub_category: &str) -> Result<Option<MiniCategory>>;

    async fn list(&self) -> Result<Vec<MiniCategory>>;

    /// Active minicategories under a category/subcategory pair
    async fn list_active_by_parent(&self, category: &str, sub_category: &str) -> Result<Vec<MiniCategory>>;

    async fn update(&self, mini: &MiniCategory) -> Result<MiniCategory>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxMiniCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxMiniCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MiniCategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

const MINI_CATEGORY_COLUMNS: &str =
    "id, name, category, sub_category, image, sort_order, status, created_at, updated_at";

#[async_trait]
impl MiniCategoryRepository for SqlxMiniCategoryRepository {
    async fn create(&self, mini: &MiniCategory) -> Result<MiniCategory> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO mini_categories (name, category, sub_category, image, sort_order, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&mini.name)
        .bind(&mini.category)
        .bind(&mini.sub_category)
        .bind(&mini.image)
        .bind(mini.sort_order)
        .bind(mini.status)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create minicategory")?;

        Ok(MiniCategory {
            id: result.last_insert_rowid(),
            created_at: now,
            updated_at: now,
            ..mini.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<MiniCategory>> {
        get_mini_category_by_id(self.pool.sqlite(), id).await
    }

    async fn find(&self, name: &str, category: &str, sub_category: &str) -> Result<Option<MiniCategory>> {
        let sql = format!(
            "SELECT {} FROM mini_categories WHERE name = ? AND category = ? AND sub_category = ?",
            MINI_CATEGORY_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(name.trim())
            .bind(category.trim())
            .bind(sub_category.trim())
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to find minicategory")?;
        Ok(row.as_ref().map(row_to_mini_category))
    }

    async fn list(&self) -> Result<Vec<MiniCategory>> {
        let sql = format!(
            "SELECT {} FROM mini_categories ORDER BY category ASC, sub_category ASC, sort_order ASC, name ASC",
            MINI_CATEGORY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list minicategories")?;
        Ok(rows.iter().map(row_to_mini_category).collect())
    }

    async fn list_active_by_parent(&self, category: &str, sub_category: &str) -> Result<Vec<MiniCategory>> {
        let sql = format!(
            "SELECT {} FROM mini_categories WHERE category = ? AND sub_category = ? AND status = 1 \
             ORDER BY sort_order ASC, name ASC",
            MINI_CATEGORY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(category.trim())
            .bind(sub_category.trim())
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list minicategories by parent")?;
        Ok(rows.iter().map(row_to_mini_category).collect())
    }

    async fn update(&self, mini: &MiniCategory) -> Result<MiniCategory> {
        sqlx::query(
            r#"
            UPDATE mini_categories
            SET name = ?, category = ?, sub_category = ?, image = ?, sort_order = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&mini.name)
        .bind(&mini.category)
        .bind(&mini.sub_category)
        .bind(&mini.image)
        .bind(mini.sort_order)
        .bind(mini.status)
        .bind(Utc::now())
        .bind(mini.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update minicategory")?;

        get_mini_category_by_id(self.pool.sqlite(), mini.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Minicategory not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM mini_categories WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete minicategory")?;
        Ok(result.rows_affected() > 0)
    }
}

async fn get_mini_category_by_id(pool: &SqlitePool, id: i64) -> Result<Option<MiniCategory>> {
    let sql = format!("SELECT {} FROM mini_categories WHERE id = ?", MINI_CATEGORY_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get minicategory by ID")?;
    Ok(row.as_ref().map(row_to_mini_category))
}

fn row_to_mini_category(row: &sqlx::sqlite::SqliteRow) -> MiniCategory {
    MiniCategory {
        id: row.get("id"),
        name: row.get("name"),
        category: row.get("category"),
        sub_category: row.get("sub_category"),
        image: row.get("image"),
        sort_order: row.get("sort_order"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
