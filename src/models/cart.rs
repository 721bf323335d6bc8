//! Cart and wishlist models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProductView;
use crate::services::pricing::CartTotals;

/// Cart line joined with its (active) product
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub product: ProductView,
}

/// Cart as returned to the shopper
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub user_email: String,
    pub items: Vec<CartLine>,
    pub totals: CartTotals,
}

impl CartView {
    pub fn new(user_email: String, items: Vec<CartLine>) -> Self {
        let totals = CartTotals::from_lines(
            items
                .iter()
                .map(|line| (line.product.discounted_price, line.quantity)),
        );
        Self {
            user_email,
            items,
            totals,
        }
    }

    /// A cart with no stored lines
    pub fn empty(user_email: String) -> Self {
        Self::new(user_email, Vec::new())
    }
}

/// Wishlist line joined with its (active) product
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistLine {
    pub product_id: i64,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
    pub product: ProductView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistView {
    pub user_email: String,
    pub items: Vec<WishlistLine>,
    pub total_items: i64,
}

impl WishlistView {
    pub fn new(user_email: String, items: Vec<WishlistLine>) -> Self {
        let total_items = items.iter().map(|line| line.quantity).sum();
        Self {
            user_email,
            items,
            total_items,
        }
    }
}

/// Body of "add to cart" / "add to wishlist"
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemInput {
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

/// Body of a quantity update
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateQuantityInput {
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}
