//! Cart repository
//!
//! One cart per user email. Lines reference products; listings only
//! return lines whose product still exists and is listed.

use crate::db::repositories::product::row_to_product;
use crate::db::DynDatabasePool;
use crate::models::CartLine;
use crate::services::pricing::{merge_quantity, QuantityMerge};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Result of adding a product to a cart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAddOutcome {
    /// Line stored with this quantity
    Stored(i64),
    /// Product missing, unlisted, or stock below the requested quantity
    Unavailable,
    /// Existing + requested quantity exceeds the per-product cap
    OverLimit,
    /// The merged quantity exceeds the stock on hand
    InsufficientStock { available: i64 },
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Cart id for the email, if one exists
    async fn find_cart(&self, user_email: &str) -> Result<Option<i64>>;

    /// Lines on active products, oldest first
    async fn lines(&self, user_email: &str) -> Result<Vec<CartLine>>;

    /// Add `quantity` units, creating the cart and merging with an existing line
    async fn add_item(&self, user_email: &str, product_id: i64, quantity: i64) -> Result<CartAddOutcome>;

    async fn set_quantity(&self, cart_id: i64, product_id: i64, quantity: i64) -> Result<bool>;

    async fn remove_item(&self, cart_id: i64, product_id: i64) -> Result<bool>;

    /// Remove every line of the cart
    async fn clear(&self, cart_id: i64) -> Result<u64>;

    /// Sum of quantities on active products
    async fn count(&self, user_email: &str) -> Result<i64>;
}

pub struct SqlxCartRepository {
    pool: DynDatabasePool,
}

impl SqlxCartRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CartRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CartRepository for SqlxCartRepository {
    async fn find_cart(&self, user_email: &str) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT id FROM carts WHERE user_email = ?")
            .bind(user_email.to_lowercase())
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to find cart")?;
        Ok(row.map(|r| r.get("id")))
    }

    async fn lines(&self, user_email: &str) -> Result<Vec<CartLine>> {
        list_lines(self.pool.sqlite(), user_email).await
    }

    async fn add_item(&self, user_email: &str, product_id: i64, quantity: i64) -> Result<CartAddOutcome> {
        add_item_tx(self.pool.sqlite(), user_email, product_id, quantity).await
    }

    async fn set_quantity(&self, cart_id: i64, product_id: i64, quantity: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = ?, updated_at = ? WHERE cart_id = ? AND product_id = ?",
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(cart_id)
        .bind(product_id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update cart item")?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_item(&self, cart_id: i64, product_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = ? AND product_id = ?")
            .bind(cart_id)
            .bind(product_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to remove cart item")?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, cart_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
            .bind(cart_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to clear cart")?;
        Ok(result.rows_affected())
    }

    async fn count(&self, user_email: &str) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(ci.quantity), 0) as count
            FROM carts c
            JOIN cart_items ci ON ci.cart_id = c.id
            JOIN products p ON p.id = ci.product_id
            WHERE c.user_email = ? AND p.status = 1
            "#,
        )
        .bind(user_email.to_lowercase())
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to count cart items")?;
        Ok(row.get("count"))
    }
}

async fn list_lines(pool: &SqlitePool, user_email: &str) -> Result<Vec<CartLine>> {
    let rows = sqlx::query(
        r#"
        SELECT p.*, ci.quantity AS item_quantity, ci.added_at AS item_added_at,
               ci.updated_at AS item_updated_at
        FROM carts c
        JOIN cart_items ci ON ci.cart_id = c.id
        JOIN products p ON p.id = ci.product_id
        WHERE c.user_email = ? AND p.status = 1
        ORDER BY ci.added_at, ci.id
        "#,
    )
    .bind(user_email.to_lowercase())
    .fetch_all(pool)
    .await
    .context("Failed to list cart items")?;

    rows.iter()
        .map(|row| {
            let product = row_to_product(row)?;
            Ok(CartLine {
                product_id: product.id,
                quantity: row.get("item_quantity"),
                added_at: row.get("item_added_at"),
                updated_at: row.get("item_updated_at"),
                product: product.into(),
            })
        })
        .collect()
}

/// Stock check, merge and write happen in one transaction so concurrent
/// adds cannot push a line past the cap or the stock.
async fn add_item_tx(pool: &SqlitePool, user_email: &str, product_id: i64, quantity: i64) -> Result<CartAddOutcome> {
    let email = user_email.to_lowercase();
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin cart transaction")?;

    // Write first so the transaction holds the write lock before it reads
    let cart_id: i64 = sqlx::query(
        r#"
        INSERT INTO carts (user_email, created_at, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(user_email) DO UPDATE SET updated_at = excluded.updated_at
        RETURNING id
        "#,
    )
    .bind(&email)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .context("Failed to create cart")?
    .get("id");

    let product = sqlx::query("SELECT stock, status FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to read product stock")?;
    let stock: i64 = match product {
        Some(row) if row.get::<bool, _>("status") && row.get::<i64, _>("stock") >= quantity => row.get("stock"),
        _ => return Ok(CartAddOutcome::Unavailable),
    };

    let existing: Option<i64> = sqlx::query("SELECT quantity FROM cart_items WHERE cart_id = ? AND product_id = ?")
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to read cart item")?
        .map(|row| row.get("quantity"));

    let outcome = match existing {
        None => {
            sqlx::query(
                r#"
                INSERT INTO cart_items (cart_id, product_id, quantity, added_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(cart_id)
            .bind(product_id)
            .bind(quantity)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to insert cart item")?;
            CartAddOutcome::Stored(quantity)
        }
        Some(current) => match merge_quantity(current, quantity) {
            QuantityMerge::OverLimit(_) => return Ok(CartAddOutcome::OverLimit),
            QuantityMerge::Accepted(merged) if merged > stock => {
                return Ok(CartAddOutcome::InsufficientStock { available: stock })
            }
            QuantityMerge::Accepted(merged) => {
                sqlx::query("UPDATE cart_items SET quantity = ?, updated_at = ? WHERE cart_id = ? AND product_id = ?")
                    .bind(merged)
                    .bind(now)
                    .bind(cart_id)
                    .bind(product_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to merge cart item")?;
                CartAddOutcome::Stored(merged)
            }
        },
    };

    tx.commit().await.context("Failed to commit cart transaction")?;
    Ok(outcome)
}
