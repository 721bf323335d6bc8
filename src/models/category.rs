//! Catalogue taxonomy: categories, subcategories and minicategories
//!
//! Subcategories reference their category by name, and minicategories
//! reference both names. Names are compared without regard to case and
//! stored with the spelling of the referenced record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// `data:image/...` URL
    pub image: Option<String>,
    pub sort_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: i64,
    pub name: String,
    /// Name of the parent category
    pub category: String,
    pub sort_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MiniCategory {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub sub_category: String,
    pub image: Option<String>,
    pub sort_order: i64,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update body for a category; on update absent fields are kept
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: Option<String>,
    pub image: Option<String>,
    pub sort_order: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategoryInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub sort_order: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniCategoryInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub image: Option<String>,
    pub sort_order: Option<i64>,
    pub status: Option<bool>,
}

/// A navigation tab on the storefront
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: i64,
    pub name: String,
    pub status: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInput {
    pub name: Option<String>,
    pub status: Option<bool>,
    pub sort_order: Option<i64>,
}

/// Whether `value` is an inline image data URL
pub fn is_image_data_url(value: &str) -> bool {
    value.starts_with("data:image/")
}
