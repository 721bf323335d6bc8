//! Promotional banners and hero sliders

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Promotional banner; `id` comes from the `bannerId` counter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: i64,
    pub background_image: String,
    pub category: String,
    pub discount: f64,
    pub sort_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerInput {
    pub background_image: Option<String>,
    pub category: Option<String>,
    pub discount: Option<f64>,
    pub sort_order: Option<i64>,
    pub is_active: Option<bool>,
}

/// Full-width slide on the storefront home page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeroSlider {
    pub id: i64,
    /// `data:image/...` URL
    pub background_image: String,
    pub category: String,
    pub discount: f64,
    pub sort_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroSliderInput {
    pub background_image: Option<String>,
    pub category: Option<String>,
    pub discount: Option<f64>,
    pub sort_order: Option<i64>,
    pub is_active: Option<bool>,
}
