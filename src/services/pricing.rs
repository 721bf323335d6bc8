//! Price and cart total arithmetic
//!
//! Pure functions shared by the product, cart and wishlist services.
//! All money values are rounded to cents at each reported step.

use serde::{Deserialize, Serialize};

/// Upper bound on the quantity of a single product in one cart
pub const MAX_QTY_PER_PRODUCT: i64 = 99;

/// Tax rate applied to the cart subtotal
pub const TAX_RATE: f64 = 0.10;

/// Flat shipping charged when the subtotal does not exceed the threshold
pub const SHIPPING_FEE: f64 = 10.0;

/// Subtotals strictly above this ship for free
pub const FREE_SHIPPING_THRESHOLD: f64 = 100.0;

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Price after a percentage discount, rounded to cents.
///
/// A zero (or negative) discount returns `price` untouched.
pub fn discounted_price(price: f64, discount: f64) -> f64 {
    if discount <= 0.0 {
        return price;
    }
    round2(price - price * discount / 100.0)
}

/// Result of merging a requested quantity into an existing cart line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityMerge {
    Accepted(i64),
    /// The merged quantity would exceed [`MAX_QTY_PER_PRODUCT`]
    OverLimit(i64),
}

/// Combine an existing line quantity with a new request.
///
/// The sum is never truncated: anything above the cap is rejected.
pub fn merge_quantity(existing: i64, requested: i64) -> QuantityMerge {
    let merged = existing.saturating_add(requested);
    if merged > MAX_QTY_PER_PRODUCT {
        QuantityMerge::OverLimit(merged)
    } else {
        QuantityMerge::Accepted(merged)
    }
}

/// Whether a single-line quantity is acceptable in a cart
pub fn is_valid_cart_quantity(quantity: i64) -> bool {
    (1..=MAX_QTY_PER_PRODUCT).contains(&quantity)
}

/// Cart summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub shipping: f64,
    pub total: f64,
    pub total_items: i64,
}

impl CartTotals {
    /// Compute totals from `(discounted unit price, quantity)` lines.
    ///
    /// An empty cart has nothing to ship and reports zero everywhere.
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (f64, i64)>,
    {
        let mut subtotal = 0.0;
        let mut total_items = 0;
        let mut any = false;

        for (unit_price, quantity) in lines {
            subtotal += unit_price * quantity as f64;
            total_items += quantity;
            any = true;
        }

        if !any {
            return Self::default();
        }

        let subtotal = round2(subtotal);
        let tax = round2(subtotal * TAX_RATE);
        let shipping = if subtotal > FREE_SHIPPING_THRESHOLD {
            0.0
        } else {
            SHIPPING_FEE
        };

        Self {
            subtotal,
            tax,
            shipping,
            total: round2(subtotal + tax + shipping),
            total_items,
        }
    }
}
