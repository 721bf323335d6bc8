//! Cart service
//!
//! One cart per shopper, keyed by the lowercased account email. Totals are
//! recomputed from the active lines on every read.

use crate::db::repositories::{CartAddOutcome, CartRepository, ProductRepository};
use crate::models::CartView;
use crate::services::pricing::{is_valid_cart_quantity, MAX_QTY_PER_PRODUCT};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CartServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Outcome of adding to the cart
#[derive(Debug, Clone)]
pub struct CartAddResult {
    pub cart: CartView,
    /// Units across all active lines
    pub cart_count: i64,
    /// The product was already in the cart and its quantity was increased
    pub merged: bool,
}

pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { carts, products }
    }

    /// The shopper's cart; a shopper without one gets an empty cart
    pub async fn get(&self, email: &str) -> Result<CartView, CartServiceError> {
        let email = normalize(email);
        let lines = self.carts.lines(&email).await.context("Failed to load cart")?;
        Ok(CartView::new(email, lines))
    }

    /// Add `quantity` units, merging with an existing line
    pub async fn add(&self, email: &str, product_id: i64, quantity: i64) -> Result<CartAddResult, CartServiceError> {
        if !is_valid_cart_quantity(quantity) {
            return Err(quantity_out_of_range());
        }

        let email = normalize(email);
        let outcome = self
            .carts
            .add_item(&email, product_id, quantity)
            .await
            .context("Failed to add cart item")?;

        let stored = match outcome {
            CartAddOutcome::Stored(stored) => stored,
            CartAddOutcome::Unavailable => {
                return Err(CartServiceError::NotFound(
                    "Product not found or insufficient stock".to_string(),
                ))
            }
            CartAddOutcome::OverLimit => {
                return Err(CartServiceError::ValidationError(format!(
                    "Maximum {} items allowed per product",
                    MAX_QTY_PER_PRODUCT
                )))
            }
            CartAddOutcome::InsufficientStock { available } => return Err(insufficient_stock(available)),
        };

        let cart = self.get(&email).await?;
        Ok(CartAddResult {
            cart_count: cart.totals.total_items,
            cart,
            merged: stored != quantity,
        })
    }

    /// Set the quantity of a line already in the cart
    pub async fn update_quantity(
        &self,
        email: &str,
        product_id: i64,
        quantity: i64,
    ) -> Result<CartView, CartServiceError> {
        if !is_valid_cart_quantity(quantity) {
            return Err(quantity_out_of_range());
        }

        let product = self
            .products
            .get_by_id(product_id)
            .await
            .context("Failed to get product")?
            .ok_or_else(|| CartServiceError::NotFound("Product not found".to_string()))?;
        if product.stock < quantity {
            return Err(insufficient_stock(product.stock));
        }

        let cart_id = self.require_cart(email).await?;
        let updated = self
            .carts
            .set_quantity(cart_id, product_id, quantity)
            .await
            .context("Failed to update cart item")?;
        if !updated {
            return Err(item_not_found());
        }

        self.get(email).await
    }

    /// Drop a line. Removing something that is not in the cart is an error.
    pub async fn remove(&self, email: &str, product_id: i64) -> Result<CartView, CartServiceError> {
        let cart_id = self.require_cart(email).await?;
        let removed = self
            .carts
            .remove_item(cart_id, product_id)
            .await
            .context("Failed to remove cart item")?;
        if !removed {
            return Err(item_not_found());
        }

        self.get(email).await
    }

    pub async fn clear(&self, email: &str) -> Result<CartView, CartServiceError> {
        let cart_id = self.require_cart(email).await?;
        self.carts.clear(cart_id).await.context("Failed to clear cart")?;
        Ok(CartView::empty(normalize(email)))
    }

    /// Units across the active lines
    pub async fn count(&self, email: &str) -> Result<i64, CartServiceError> {
        let count = self
            .carts
            .count(&normalize(email))
            .await
            .context("Failed to count cart items")?;
        Ok(count)
    }

    async fn require_cart(&self, email: &str) -> Result<i64, CartServiceError> {
        self.carts
            .find_cart(&normalize(email))
            .await
            .context("Failed to find cart")?
            .ok_or_else(|| CartServiceError::NotFound("Cart not found".to_string()))
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn quantity_out_of_range() -> CartServiceError {
    CartServiceError::ValidationError(format!("Quantity must be between 1 and {}", MAX_QTY_PER_PRODUCT))
}

fn insufficient_stock(available: i64) -> CartServiceError {
    CartServiceError::ValidationError(format!("Only {} items available in stock", available))
}

fn item_not_found() -> CartServiceError {
    CartServiceError::NotFound("Item not found in cart".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::product::test_support::sample_product;
    use crate::db::repositories::{SqlxCartRepository, SqlxProductRepository};
    use crate::db::{create_test_pool, migrations};

    struct Fixture {
        service: CartService,
        products: Arc<dyn ProductRepository>,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let products = SqlxProductRepository::boxed(pool.clone());
        let service = CartService::new(SqlxCartRepository::boxed(pool), products.clone());
        Fixture { service, products }
    }

    async fn product(fx: &Fixture, sku: &str, price: f64, stock: i64) -> i64 {
        fx.products.create(&sample_product(sku, price, stock)).await.unwrap().id
    }

    #[tokio::test]
    async fn test_get_without_cart_is_empty() {
        let fx = setup().await;
        let cart = fx.service.get("Ada@Example.com").await.unwrap();
        assert_eq!(cart.user_email, "ada@example.com");
        assert!(cart.items.is_empty());
        assert_eq!(cart.totals.total, 0.0);
    }

    #[tokio::test]
    async fn test_add_merges_and_reports_count() {
        let fx = setup().await;
        let id = product(&fx, "A", 20.0, 50).await;

        let first = fx.service.add("ada@example.com", id, 2).await.unwrap();
        assert!(!first.merged);
        assert_eq!(first.cart_count, 2);

        let second = fx.service.add("ADA@example.com", id, 3).await.unwrap();
        assert!(second.merged);
        assert_eq!(second.cart_count, 5);
        assert_eq!(second.cart.items.len(), 1);
        assert_eq!(second.cart.totals.subtotal, 100.0);
        assert_eq!(second.cart.totals.shipping, 10.0);
        assert_eq!(second.cart.totals.total, 120.0);
    }

    #[tokio::test]
    async fn test_add_error_messages() {
        let fx = setup().await;
        let id = product(&fx, "A", 1.0, 100).await;
        let scarce = product(&fx, "B", 1.0, 3).await;

        let err = fx.service.add("ada@example.com", id, 0).await.unwrap_err();
        assert_eq!(err.to_string(), "Quantity must be between 1 and 99");

        let err = fx.service.add("ada@example.com", 9999, 1).await.unwrap_err();
        assert_eq!(err.to_string(), "Product not found or insufficient stock");

        fx.service.add("ada@example.com", id, 60).await.unwrap();
        let err = fx.service.add("ada@example.com", id, 40).await.unwrap_err();
        assert_eq!(err.to_string(), "Maximum 99 items allowed per product");
        assert_eq!(fx.service.count("ada@example.com").await.unwrap(), 60);

        fx.service.add("ada@example.com", scarce, 2).await.unwrap();
        let err = fx.service.add("ada@example.com", scarce, 2).await.unwrap_err();
        assert_eq!(err.to_string(), "Only 3 items available in stock");
    }

    #[tokio::test]
    async fn test_update_quantity_checks_stock_and_presence() {
        let fx = setup().await;
        let id = product(&fx, "A", 10.0, 5).await;
        let other = product(&fx, "B", 10.0, 5).await;

        assert!(matches!(
            fx.service.update_quantity("ada@example.com", id, 1).await,
            Err(CartServiceError::NotFound(msg)) if msg == "Cart not found"
        ));

        fx.service.add("ada@example.com", id, 1).await.unwrap();
        let cart = fx.service.update_quantity("ada@example.com", id, 4).await.unwrap();
        assert_eq!(cart.totals.total_items, 4);

        let err = fx.service.update_quantity("ada@example.com", id, 6).await.unwrap_err();
        assert_eq!(err.to_string(), "Only 5 items available in stock");

        let err = fx.service.update_quantity("ada@example.com", other, 1).await.unwrap_err();
        assert_eq!(err.to_string(), "Item not found in cart");
    }

    #[tokio::test]
    async fn test_remove_missing_item_is_not_found() {
        let fx = setup().await;
        let id = product(&fx, "A", 10.0, 5).await;
        fx.service.add("ada@example.com", id, 1).await.unwrap();

        let cart = fx.service.remove("ada@example.com", id).await.unwrap();
        assert!(cart.items.is_empty());

        let err = fx.service.remove("ada@example.com", id).await.unwrap_err();
        assert_eq!(err.to_string(), "Item not found in cart");
    }

    #[tokio::test]
    async fn test_clear_requires_cart() {
        let fx = setup().await;
        assert!(matches!(
            fx.service.clear("ada@example.com").await,
            Err(CartServiceError::NotFound(_))
        ));

        let id = product(&fx, "A", 10.0, 5).await;
        fx.service.add("ada@example.com", id, 2).await.unwrap();
        let cart = fx.service.clear("ada@example.com").await.unwrap();
        assert_eq!(cart.totals.total_items, 0);
        assert_eq!(fx.service.count("ada@example.com").await.unwrap(), 0);
    }
}
