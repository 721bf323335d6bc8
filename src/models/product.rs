//! Product model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::pricing::discounted_price;

/// A catalogue product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    /// Stock-keeping unit, unique ignoring case
    pub sku: String,
    pub name: String,
    pub price: f64,
    /// Percentage discount, 0..=100
    pub discount: f64,
    pub is_new: bool,
    /// Average review rating, 0..=5
    pub rating: f64,
    pub sale_count: i64,
    pub category: Vec<String>,
    pub tag: Vec<String>,
    pub stock: i64,
    /// Data URLs or absolute URLs
    pub image: Vec<String>,
    pub short_description: String,
    pub full_description: String,
    /// Whether the product is listed
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn discounted_price(&self) -> f64 {
        discounted_price(self.price, self.discount)
    }
}

/// Product as returned by the API: every field plus the discounted price
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub discounted_price: f64,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let discounted_price = product.discounted_price();
        Self {
            product,
            discounted_price,
        }
    }
}

/// Input for creating a product
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub discount: Option<f64>,
    #[serde(alias = "new")]
    pub is_new: Option<bool>,
    pub rating: Option<f64>,
    pub sale_count: Option<i64>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub category: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub tag: Vec<String>,
    pub stock: Option<i64>,
    #[serde(default)]
    pub image: Vec<String>,
    pub short_description: Option<String>,
    pub full_description: Option<String>,
    pub status: Option<bool>,
}

/// Partial product update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductInput {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub discount: Option<f64>,
    #[serde(alias = "new")]
    pub is_new: Option<bool>,
    pub rating: Option<f64>,
    pub sale_count: Option<i64>,
    #[serde(default, deserialize_with = "optional_string_or_list")]
    pub category: Option<Vec<String>>,
    #[serde(default, deserialize_with = "optional_string_or_list")]
    pub tag: Option<Vec<String>>,
    pub stock: Option<i64>,
    pub image: Option<Vec<String>>,
    pub short_description: Option<String>,
    pub full_description: Option<String>,
    pub status: Option<bool>,
}

/// Accept either `["a", "b"]` or the comma separated `"a, b"` form-style value
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            StringOrList::One(s) => s.split(',').map(str::to_string).collect(),
            StringOrList::Many(items) => items,
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(StringOrList::deserialize(deserializer)?.into_vec())
}

fn optional_string_or_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<StringOrList>::deserialize(deserializer)?.map(StringOrList::into_vec))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_accepts_comma_string_and_list() {
        let input: CreateProductInput =
            serde_json::from_value(serde_json::json!({ "category": "Shoes, Men ,", "tag": ["sale", " new "] }))
                .unwrap();
        assert_eq!(input.category, vec!["Shoes", "Men"]);
        assert_eq!(input.tag, vec!["sale", "new"]);
    }

    #[test]
    fn test_update_distinguishes_absent_list() {
        let input: UpdateProductInput = serde_json::from_value(serde_json::json!({ "name": "x" })).unwrap();
        assert!(input.category.is_none());

        let input: UpdateProductInput = serde_json::from_value(serde_json::json!({ "tag": [] })).unwrap();
        assert_eq!(input.tag, Some(vec![]));
    }

    #[test]
    fn test_new_alias() {
        let input: CreateProductInput = serde_json::from_value(serde_json::json!({ "new": true })).unwrap();
        assert_eq!(input.is_new, Some(true));
    }
}
