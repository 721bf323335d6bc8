//! Category repository
//!
//! Database operations for top-level catalogue categories.

use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by name, ignoring case
    async fn get_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// List all categories by sort order, then name
    async fn list(&self) -> Result<Vec<Category>>;

    /// Update a category
    async fn update(&self, category: &Category) -> Result<Category>;

    /// Delete a category
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Check if another category already uses the name
    async fn exists_by_name(&self, name: &str, exclude_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        create_category(self.pool.sqlite(), category).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        get_category_by_id(self.pool.sqlite(), id).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        // `name` is declared COLLATE NOCASE, so equality ignores case.
        let sql = format!("SELECT {} FROM categories WHERE name = ?", CATEGORY_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(name.trim())
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get category by name")?;
        Ok(row.as_ref().map(row_to_category))
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, image, sort_order, is_active, created_at, updated_at
            FROM categories
            ORDER BY sort_order ASC, name ASC
            "#,
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list categories")?;

        Ok(rows.iter().map(row_to_category).collect())
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        update_category(self.pool.sqlite(), category).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete category")?;
        Ok(result.rows_affected() > 0)
    }

    async fn exists_by_name(&self, name: &str, exclude_id: Option<i64>) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM categories WHERE name = ? AND id != ?")
            .bind(name.trim())
            .bind(exclude_id.unwrap_or(0))
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to check category name")?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }
}

async fn create_category(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, image, sort_order, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.name)
    .bind(&category.image)
    .bind(category.sort_order)
    .bind(category.is_active)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..category.clone()
    })
}

const CATEGORY_COLUMNS: &str = "id, name, image, sort_order, is_active, created_at, updated_at";

async fn get_category_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let sql = format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    Ok(row.as_ref().map(row_to_category))
}

async fn update_category(pool: &SqlitePool, category: &Category) -> Result<Category> {
    sqlx::query(
        r#"
        UPDATE categories
        SET name = ?, image = ?, sort_order = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&category.name)
    .bind(&category.image)
    .bind(category.sort_order)
    .bind(category.is_active)
    .bind(Utc::now())
    .bind(category.id)
    .execute(pool)
    .await
    .context("Failed to update category")?;

    get_category_by_id(pool, category.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
}

fn row_to_category(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        image: row.get("image"),
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

    async fn setup_test_repo() -> SqlxCategoryRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        SqlxCategoryRepository::new(pool)
    }

    fn category(name: &str, sort_order: i64) -> Category {
        let now = Utc::now();
        Category {
            id: 0,
            name: name.to_string(),
            image: None,
            sort_order,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_by_name() {
        let repo = setup_test_repo().await;
        let created = repo.create(&category("Electronics", 0)).await.unwrap();

        let found = repo.get_by_name("electronics").await.unwrap().expect("not found");
        assert_eq!(found.id, created.id);
        assert_eq!(found.name, "Electronics");
        assert!(repo.exists_by_name("ELECTRONICS", None).await.unwrap());
        assert!(!repo.exists_by_name("Electronics", Some(created.id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_ordered_by_sort_order() {
        let repo = setup_test_repo().await;
        repo.create(&category("Zeta", 0)).await.unwrap();
        repo.create(&category("Alpha", 2)).await.unwrap();
        repo.create(&category("Beta", 0)).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Beta", "Zeta", "Alpha"]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = setup_test_repo().await;
        let mut created = repo.create(&category("Old", 0)).await.unwrap();

        created.name = "New".into();
        created.is_active = false;
        let updated = repo.update(&created).await.unwrap();
        assert_eq!(updated.name, "New");
        assert!(!updated.is_active);

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_violates_unique() {
        let repo = setup_test_repo().await;
        repo.create(&category("Books", 0)).await.unwrap();
        let err = repo.create(&category("BOOKS", 1)).await.unwrap_err();
        assert!(crate::db::is_unique_violation(&err));
    }
}
