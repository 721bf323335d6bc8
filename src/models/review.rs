//! Product review model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub product_id: i64,
    /// Product name at the time of review
    pub product_name: String,
    pub name: String,
    /// Reviewer email, lowercased; one review per email per product
    pub email: String,
    pub message: String,
    /// 1..=5
    pub rating: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reviews of one product with their rounded average
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReviews {
    pub product_id: i64,
    pub count: usize,
    pub average_rating: f64,
    pub reviews: Vec<Review>,
}

/// Input for posting a review; name and email default to the caller's account
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewInput {
    pub product_id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: String,
    pub rating: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewInput {
    pub name: Option<String>,
    pub message: Option<String>,
    pub rating: Option<i64>,
}
