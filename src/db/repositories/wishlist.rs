//! Wishlist repository

use crate::db::repositories::product::row_to_product;
use crate::db::DynDatabasePool;
use crate::models::WishlistLine;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait WishlistRepository: Send + Sync {
    async fn find_wishlist(&self, user_email: &str) -> Result<Option<i64>>;

    /// Lines on active products, oldest first
    async fn lines(&self, user_email: &str) -> Result<Vec<WishlistLine>>;

    /// Insert the product or overwrite its quantity
    async fn put_item(&self, user_email: &str, product_id: i64, quantity: i64) -> Result<()>;

    async fn set_quantity(&self, wishlist_id: i64, product_id: i64, quantity: i64) -> Result<bool>;

    async fn remove_item(&self, wishlist_id: i64, product_id: i64) -> Result<bool>;

    async fn clear(&self, wishlist_id: i64) -> Result<u64>;

    async fn contains(&self, user_email: &str, product_id: i64) -> Result<bool>;
}

pub struct SqlxWishlistRepository {
    pool: DynDatabasePool,
}

impl SqlxWishlistRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn WishlistRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl WishlistRepository for SqlxWishlistRepository {
    async fn find_wishlist(&self, user_email: &str) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT id FROM wishlists WHERE user_email = ?")
            .bind(user_email.to_lowercase())
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to find wishlist")?;
        Ok(row.map(|r| r.get("id")))
    }

    async fn lines(&self, user_email: &str) -> Result<Vec<WishlistLine>> {
        list_lines(self.pool.sqlite(), user_email).await
    }

    async fn put_item(&self, user_email: &str, product_id: i64, quantity: i64) -> Result<()> {
        put_item_tx(self.pool.sqlite(), user_email, product_id, quantity).await
    }

    async fn set_quantity(&self, wishlist_id: i64, product_id: i64, quantity: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE wishlist_items SET quantity = ? WHERE wishlist_id = ? AND product_id = ?")
            .bind(quantity)
            .bind(wishlist_id)
            .bind(product_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update wishlist item")?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_item(&self, wishlist_id: i64, product_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE wishlist_id = ? AND product_id = ?")
            .bind(wishlist_id)
            .bind(product_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to remove wishlist item")?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, wishlist_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE wishlist_id = ?")
            .bind(wishlist_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to clear wishlist")?;
        Ok(result.rows_affected())
    }

    async fn contains(&self, user_email: &str, product_id: i64) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM wishlists w
            JOIN wishlist_items wi ON wi.wishlist_id = w.id
            WHERE w.user_email = ? AND wi.product_id = ?
            "#,
        )
        .bind(user_email.to_lowercase())
        .bind(product_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to check wishlist")?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }
}

async fn list_lines(pool: &SqlitePool, user_email: &str) -> Result<Vec<WishlistLine>> {
    let rows = sqlx::query(
        r#"
        SELECT p.*, wi.quantity AS item_quantity, wi.added_at AS item_added_at
        FROM wishlists w
        JOIN wishlist_items wi ON wi.wishlist_id = w.id
        JOIN products p ON p.id = wi.product_id
        WHERE w.user_email = ? AND p.status = 1
        ORDER BY wi.added_at, wi.id
        "#,
    )
    .bind(user_email.to_lowercase())
    .fetch_all(pool)
    .await
    .context("Failed to list wishlist items")?;

    rows.iter()
        .map(|row| {
            let product = row_to_product(row)?;
            Ok(WishlistLine {
                product_id: product.id,
                quantity: row.get("item_quantity"),
                added_at: row.get("item_added_at"),
                product: product.into(),
            })
        })
        .collect()
}

async fn put_item_tx(pool: &SqlitePool, user_email: &str, product_id: i64, quantity: i64) -> Result<()> {
    let email = user_email.to_lowercase();
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin wishlist transaction")?;

    sqlx::query(
        r#"
        INSERT INTO wishlists (user_email, created_at, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(user_email) DO UPDATE SET updated_at = excluded.updated_at
        "#,
    )
    .bind(&email)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create wishlist")?;

    sqlx::query(
        r#"
        INSERT INTO wishlist_items (wishlist_id, product_id, quantity, added_at)
        SELECT id, ?, ?, ? FROM wishlists WHERE user_email = ?
        ON CONFLICT(wishlist_id, product_id) DO UPDATE SET quantity = excluded.quantity
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .bind(&email)
    .execute(&mut *tx)
    .await
    .context("Failed to store wishlist item")?;

    tx.commit().await.context("Failed to commit wishlist transaction")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::product::test_support::sample_product;
    use crate::db::repositories::{ProductRepository, SqlxProductRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (SqlxWishlistRepository, SqlxProductRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        (SqlxWishlistRepository::new(pool.clone()), SqlxProductRepository::new(pool))
    }

    #[tokio::test]
    async fn test_put_item_sets_quantity() {
        let (wishlists, products) = setup().await;
        let product = products.create(&sample_product("W1", 3.0, 1)).await.unwrap();

        wishlists.put_item("w@example.com", product.id, 2).await.unwrap();
        wishlists.put_item("w@example.com", product.id, 5).await.unwrap();

        let lines = wishlists.lines("w@example.com").await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
        assert!(wishlists.contains("W@example.com", product.id).await.unwrap());
        assert!(!wishlists.contains("w@example.com", product.id + 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let (wishlists, products) = setup().await;
        let p1 = products.create(&sample_product("W1", 3.0, 1)).await.unwrap();
        let p2 = products.create(&sample_product("W2", 3.0, 1)).await.unwrap();
        wishlists.put_item("x@example.com", p1.id, 1).await.unwrap();
        wishlists.put_item("x@example.com", p2.id, 1).await.unwrap();
        let id = wishlists.find_wishlist("x@example.com").await.unwrap().unwrap();

        assert!(wishlists.set_quantity(id, p1.id, 4).await.unwrap());
        assert!(wishlists.remove_item(id, p2.id).await.unwrap());
        assert!(!wishlists.remove_item(id, p2.id).await.unwrap());
        assert_eq!(wishlists.clear(id).await.unwrap(), 1);
    }
}
