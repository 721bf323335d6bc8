//! Product repository
//!
//! Category, tag and image lists are stored as JSON arrays and matched
//! element-wise with SQLite's `json_each`.

use crate::db::DynDatabasePool;
use crate::models::Product;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Which products a listing returns
#[derive(Debug, Clone, PartialEq)]
pub enum ProductFilter {
    /// Every product, listed or not
    All,
    /// Listed products only
    Active,
    /// Listed products whose category list contains the name (any case)
    Category(String),
    /// Listed products whose tag list contains the name (any case)
    Tag(String),
    /// Listed products flagged as new
    New,
    /// Listed products whose name contains the text (any case)
    Search(String),
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, product: &Product) -> Result<Product>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Product>>;

    /// Whether another product (other than `exclude_id`) uses this SKU
    async fn sku_exists(&self, sku: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Products matching the filter, newest first
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>>;

    async fn update(&self, product: &Product) -> Result<Product>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Store a recomputed review rating
    async fn set_rating(&self, id: i64, rating: f64) -> Result<()>;
}

pub struct SqlxProductRepository {
    pool: DynDatabasePool,
}

impl SqlxProductRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProductRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProductRepository for SqlxProductRepository {
    async fn create(&self, product: &Product) -> Result<Product> {
        create_product(self.pool.sqlite(), product).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Product>> {
        get_product_by_id(self.pool.sqlite(), id).await
    }

    async fn sku_exists(&self, sku: &str, exclude_id: Option<i64>) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM products WHERE sku = ? AND id != ?")
            .bind(sku.trim())
            .bind(exclude_id.unwrap_or(0))
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to check product SKU")?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        list_products(self.pool.sqlite(), filter).await
    }

    async fn update(&self, product: &Product) -> Result<Product> {
        update_product(self.pool.sqlite(), product).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete product")?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_rating(&self, id: i64, rating: f64) -> Result<()> {
        sqlx::query("UPDATE products SET rating = ?, updated_at = ? WHERE id = ?")
            .bind(rating)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update product rating")?;
        Ok(())
    }
}

const PRODUCT_COLUMNS: &str = "id, sku, name, price, discount, is_new, rating, sale_count, categories, tags, \
                               stock, images, short_description, full_description, status, created_at, updated_at";

async fn create_product(pool: &SqlitePool, product: &Product) -> Result<Product> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO products (sku, name, price, discount, is_new, rating, sale_count, categories, tags,
                              stock, images, short_description, full_description, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&product.sku)
    .bind(&product.name)
    .bind(product.price)
    .bind(product.discount)
    .bind(product.is_new)
    .bind(product.rating)
    .bind(product.sale_count)
    .bind(serde_json::to_string(&product.category)?)
    .bind(serde_json::to_string(&product.tag)?)
    .bind(product.stock)
    .bind(serde_json::to_string(&product.image)?)
    .bind(&product.short_description)
    .bind(&product.full_description)
    .bind(product.status)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create product")?;

    Ok(Product {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..product.clone()
    })
}

async fn get_product_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get product by ID")?;

    row.as_ref().map(row_to_product).transpose()
}

async fn list_products(pool: &SqlitePool, filter: &ProductFilter) -> Result<Vec<Product>> {
    let (condition, param) = match filter {
        ProductFilter::All => ("1 = 1", None),
        ProductFilter::Active => ("status = 1", None),
        ProductFilter::New => ("status = 1 AND is_new = 1", None),
        ProductFilter::Category(name) => (
            "status = 1 AND EXISTS (SELECT 1 FROM json_each(products.categories) WHERE lower(value) = lower(?))",
            Some(name.trim().to_string()),
        ),
        ProductFilter::Tag(name) => (
            "status = 1 AND EXISTS (SELECT 1 FROM json_each(products.tags) WHERE lower(value) = lower(?))",
            Some(name.trim().to_string()),
        ),
        ProductFilter::Search(text) => (
            "status = 1 AND instr(lower(name), lower(?)) > 0",
            Some(text.trim().to_string()),
        ),
    };

    let sql = format!(
        "SELECT {} FROM products WHERE {} ORDER BY created_at DESC, id DESC",
        PRODUCT_COLUMNS, condition
    );
    let mut query = sqlx::query(&sql);
    if let Some(param) = param {
        query = query.bind(param);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to list products ({:?})", filter))?;

    rows.iter().map(row_to_product).collect()
}

async fn update_product(pool: &SqlitePool, product: &Product) -> Result<Product> {
    sqlx::query(
        r#"
        UPDATE products
        SET sku = ?, name = ?, price = ?, discount = ?, is_new = ?, rating = ?, sale_count = ?,
            categories = ?, tags = ?, stock = ?, images = ?, short_description = ?,
            full_description = ?, status = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&product.sku)
    .bind(&product.name)
    .bind(product.price)
    .bind(product.discount)
    .bind(product.is_new)
    .bind(product.rating)
    .bind(product.sale_count)
    .bind(serde_json::to_string(&product.category)?)
    .bind(serde_json::to_string(&product.tag)?)
    .bind(product.stock)
    .bind(serde_json::to_string(&product.image)?)
    .bind(&product.short_description)
    .bind(&product.full_description)
    .bind(product.status)
    .bind(Utc::now())
    .bind(product.id)
    .execute(pool)
    .await
    .context("Failed to update product")?;

    get_product_by_id(pool, product.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Product not found after update"))
}

fn parse_list(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<Vec<String>> {
    let raw: String = row.get(column);
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in products.{}", column))
}

pub(crate) fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product> {
    Ok(Product {
        id: row.get("id"),
        sku: row.get("sku"),
        name: row.get("name"),
        price: row.get("price"),
        discount: row.get("discount"),
        is_new: row.get("is_new"),
        rating: row.get("rating"),
        sale_count: row.get("sale_count"),
        category: parse_list(row, "categories")?,
        tag: parse_list(row, "tags")?,
        stock: row.get("stock"),
        image: parse_list(row, "images")?,
        short_description: row.get("short_description"),
        full_description: row.get("full_description"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
