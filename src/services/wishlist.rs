//! Wishlist service
//!
//! Like the cart, one wishlist per account email, but adding a product that
//! is already present replaces its quantity instead of merging.

use crate::db::repositories::{ProductRepository, WishlistRepository};
use crate::models::WishlistView;
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum WishlistServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct WishlistService {
    wishlists: Arc<dyn WishlistRepository>,
    products: Arc<dyn ProductRepository>,
}

impl WishlistService {
    pub fn new(wishlists: Arc<dyn WishlistRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { wishlists, products }
    }

    pub async fn get(&self, email: &str) -> Result<WishlistView, WishlistServiceError> {
        let email = normalize(email);
        let lines = self
            .wishlists
            .lines(&email)
            .await
            .context("Failed to load wishlist")?;
        Ok(WishlistView::new(email, lines))
    }

    /// Put a listed product on the wishlist with exactly `quantity` units.
    ///
    /// Returns the wishlist and whether the product was already on it.
    pub async fn add(
        &self,
        email: &str,
        product_id: i64,
        quantity: i64,
    ) -> Result<(WishlistView, bool), WishlistServiceError> {
        validate_quantity(quantity)?;

        let listed = self
            .products
            .get_by_id(product_id)
            .await
            .context("Failed to get product")?
            .map(|p| p.status)
            .unwrap_or(false);
        if !listed {
            return Err(WishlistServiceError::NotFound(
                "Product not found or not available".to_string(),
            ));
        }

        let email = normalize(email);
        let existed = self
            .wishlists
            .contains(&email, product_id)
            .await
            .context("Failed to check wishlist")?;
        self.wishlists
            .put_item(&email, product_id, quantity)
            .await
            .context("Failed to add wishlist item")?;

        Ok((self.get(&email).await?, existed))
    }

    pub async fn update_quantity(
        &self,
        email: &str,
        product_id: i64,
        quantity: i64,
    ) -> Result<WishlistView, WishlistServiceError> {
        validate_quantity(quantity)?;
        let wishlist_id = self.require_wishlist(email).await?;

        let updated = self
            .wishlists
            .set_quantity(wishlist_id, product_id, quantity)
            .await
            .context("Failed to update wishlist item")?;
        if !updated {
            return Err(item_not_found());
        }
        self.get(email).await
    }

    pub async fn remove(&self, email: &str, product_id: i64) -> Result<WishlistView, WishlistServiceError> {
        let wishlist_id = self.require_wishlist(email).await?;
        let removed = self
            .wishlists
            .remove_item(wishlist_id, product_id)
            .await
            .context("Failed to remove wishlist item")?;
        if !removed {
            return Err(item_not_found());
        }
        self.get(email).await
    }

    pub async fn clear(&self, email: &str) -> Result<(), WishlistServiceError> {
        let wishlist_id = self.require_wishlist(email).await?;
        self.wishlists
            .clear(wishlist_id)
            .await
            .context("Failed to clear wishlist")?;
        Ok(())
    }

    /// Whether the product is on the wishlist; unknown products are simply absent
    pub async fn contains(&self, email: &str, product_id: i64) -> Result<bool, WishlistServiceError> {
        let found = self
            .wishlists
            .contains(&normalize(email), product_id)
            .await
            .context("Failed to check wishlist")?;
        Ok(found)
    }

    async fn require_wishlist(&self, email: &str) -> Result<i64, WishlistServiceError> {
        self.wishlists
            .find_wishlist(&normalize(email))
            .await
            .context("Failed to find wishlist")?
            .ok_or_else(|| WishlistServiceError::NotFound("Wishlist not found".to_string()))
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_quantity(quantity: i64) -> Result<(), WishlistServiceError> {
    if quantity < 1 {
        return Err(WishlistServiceError::ValidationError(
            "Valid quantity is required".to_string(),
        ));
    }
    Ok(())
}

fn item_not_found() -> WishlistServiceError {
    WishlistServiceError::NotFound("Item not found in wishlist".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::product::test_support::sample_product;
    use crate::db::repositories::{SqlxProductRepository, SqlxWishlistRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (WishlistService, Arc<dyn ProductRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let products = SqlxProductRepository::boxed(pool.clone());
        (
            WishlistService::new(SqlxWishlistRepository::boxed(pool), products.clone()),
            products,
        )
    }

    #[tokio::test]
    async fn test_add_sets_quantity_instead_of_merging() {
        let (service, products) = setup().await;
        let id = products.create(&sample_product("A", 10.0, 5)).await.unwrap().id;

        let (_, existed) = service.add("ada@example.com", id, 2).await.unwrap();
        assert!(!existed);
        let (view, existed) = service.add("ada@example.com", id, 3).await.unwrap();
        assert!(existed);
        assert_eq!(view.total_items, 3);
        assert_eq!(view.items[0].product.discounted_price, 10.0);
    }

    #[tokio::test]
    async fn test_add_rejects_unlisted_product() {
        let (service, products) = setup().await;
        let mut hidden = sample_product("H", 10.0, 5);
        hidden.status = false;
        let id = products.create(&hidden).await.unwrap().id;

        let err = service.add("ada@example.com", id, 1).await.unwrap_err();
        assert_eq!(err.to_string(), "Product not found or not available");
        assert!(service.add("ada@example.com", 9999, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_clear_and_contains() {
        let (service, products) = setup().await;
        let id = products.create(&sample_product("A", 10.0, 5)).await.unwrap().id;

        assert!(!service.contains("ada@example.com", id).await.unwrap());
        assert!(!service.contains("ada@example.com", 9999).await.unwrap());
        assert!(matches!(
            service.clear("ada@example.com").await,
            Err(WishlistServiceError::NotFound(_))
        ));

        service.add("ada@example.com", id, 1).await.unwrap();
        assert!(service.contains("ADA@example.com", id).await.unwrap());

        let view = service.update_quantity("ada@example.com", id, 4).await.unwrap();
        assert_eq!(view.total_items, 4);
        assert!(service.update_quantity("ada@example.com", id, 0).await.is_err());

        service.remove("ada@example.com", id).await.unwrap();
        let err = service.remove("ada@example.com", id).await.unwrap_err();
        assert_eq!(err.to_string(), "Item not found in wishlist");

        service.clear("ada@example.com").await.unwrap();
    }
}
