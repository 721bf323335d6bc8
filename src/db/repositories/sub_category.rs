//! Subcategory repository

use crate::db::DynDatabasePool;
use crate::models::SubCategory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait SubCategoryRepository: Send + Sync {
    async fn create(&self, sub: &SubCategory) -> Result<SubCategory>;

    async fn get_by_id(&self, id: i64) -> Result<Option<SubCategory>>;

    /// Find by `(name, category)`, ignoring case
    async fn find(&self, name: &str, category: &str) -> Result<Option<SubCategory>>;

    async fn list(&self) -> Result<Vec<SubCategory>>;

    /// Active subcategories of a category
    async fn list_active_by_category(&self, category: &str) -> Result<Vec<SubCategory>>;

    async fn update(&self, sub: &SubCategory) -> Result<SubCategory>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxSubCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxSubCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubCategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

const SUB_CATEGORY_COLUMNS: &str = "id, name, category, sort_order, is_active, created_at, updated_at";

#[async_trait]
impl SubCategoryRepository for SqlxSubCategoryRepository {
    async fn create(&self, sub: &SubCategory) -> Result<SubCategory> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO sub_categories (name, category, sort_order, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&sub.name)
        .bind(&sub.category)
        .bind(sub.sort_order)
        .bind(sub.is_active)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create subcategory")?;

        Ok(SubCategory {
            id: result.last_insert_rowid(),
            created_at: now,
            updated_at: now,
            ..sub.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<SubCategory>> {
        get_sub_category_by_id(self.pool.sqlite(), id).await
    }

    async fn find(&self, name: &str, category: &str) -> Result<Option<SubCategory>> {
        let sql = format!(
            "SELECT {} FROM sub_categories WHERE name = ? AND category = ?",
            SUB_CATEGORY_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(name.trim())
            .bind(category.trim())
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to find subcategory")?;
        Ok(row.as_ref().map(row_to_sub_category))
    }

    async fn list(&self) -> Result<Vec<SubCategory>> {
        let sql = format!(
            "SELECT {} FROM sub_categories ORDER BY category ASC, sort_order ASC, name ASC",
            SUB_CATEGORY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list subcategories")?;
        Ok(rows.iter().map(row_to_sub_category).collect())
    }

    async fn list_active_by_category(&self, category: &str) -> Result<Vec<SubCategory>> {
        let sql = format!(
            "SELECT {} FROM sub_categories WHERE category = ? AND is_active = 1 ORDER BY sort_order ASC, name ASC",
            SUB_CATEGORY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(category.trim())
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list subcategories by category")?;
        Ok(rows.iter().map(row_to_sub_category).collect())
    }

    async fn update(&self, sub: &SubCategory) -> Result<SubCategory> {
        sqlx::query(
            r#"
            UPDATE sub_categories
            SET name = ?, category = ?, sort_order = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&sub.name)
        .bind(&sub.category)
        .bind(sub.sort_order)
        .bind(sub.is_active)
        .bind(Utc::now())
        .bind(sub.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update subcategory")?;

        get_sub_category_by_id(self.pool.sqlite(), sub.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Subcategory not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sub_categories WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete subcategory")?;
        Ok(result.rows_affected() > 0)
    }
}

async fn get_sub_category_by_id(pool: &SqlitePool, id: i64) -> Result<Option<SubCategory>> {
    let sql = format!("SELECT {} FROM sub_categories WHERE id = ?", SUB_CATEGORY_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get subcategory by ID")?;
    Ok(row.as_ref().map(row_to_sub_category))
}

fn row_to_sub_category(row: &sqlx::sqlite::SqliteRow) -> SubCategory {
    SubCategory {
        id: row.get("id"),
        name: row.get("name"),
        category: row.get("category"),
        sort_order: row.get("sort_order"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxSubCategoryRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        SqlxSubCategoryRepository::new(pool)
    }

    fn sub(name: &str, category: &str, is_active: bool) -> SubCategory {
        let now = Utc::now();
        SubCategory {
            id: 0,
            name: name.into(),
            category: category.into(),
            sort_order: 0,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_same_name_allowed_under_different_categories() {
        let repo = setup_test_repo().await;
        repo.create(&sub("Accessories", "Men", true)).await.unwrap();
        repo.create(&sub("Accessories", "Women", true)).await.unwrap();

        let err = repo.create(&sub("accessories", "MEN", true)).await.unwrap_err();
        assert!(crate::db::is_unique_violation(&err));
        assert!(repo.find("ACCESSORIES", "women").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_active_by_category() {
        let repo = setup_test_repo().await;
        repo.create(&sub("Shirts", "Men", true)).await.unwrap();
        repo.create(&sub("Hidden", "Men", false)).await.unwrap();
        repo.create(&sub("Dresses", "Women", true)).await.unwrap();

        let men = repo.list_active_by_category("men").await.unwrap();
        assert_eq!(men.len(), 1);
        assert_eq!(men[0].name, "Shirts");
        assert_eq!(repo.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = setup_test_repo().await;
        let mut created = repo.create(&sub("Old", "Men", true)).await.unwrap();
        created.name = "New".into();
        assert_eq!(repo.update(&created).await.unwrap().name, "New");
        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }
}
