//! Review service
//!
//! Every write recomputes the product's stored rating as the average of its
//! reviews, rounded to one decimal (0 when the last review is removed).

use crate::cache::{invalidate_responses, Cache};
use crate::db::is_unique_violation;
use crate::db::repositories::{ProductRepository, ReviewRepository};
use crate::models::{CreateReviewInput, ProductReviews, Review, UpdateReviewInput, User};
use crate::services::pricing::round1;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("You have already reviewed this product")]
    AlreadyReviewed,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    products: Arc<dyn ProductRepository>,
    cache: Arc<Cache>,
}

impl ReviewService {
    pub fn new(reviews: Arc<dyn ReviewRepository>, products: Arc<dyn ProductRepository>, cache: Arc<Cache>) -> Self {
        Self {
            reviews,
            products,
            cache,
        }
    }

    /// Every review, newest first
    pub async fn list(&self) -> Result<Vec<Review>, ReviewServiceError> {
        let reviews = self.reviews.list().await.context("Failed to list reviews")?;
        Ok(reviews)
    }

    /// Reviews of one product with count and average
    pub async fn list_by_product(&self, product_id: i64) -> Result<ProductReviews, ReviewServiceError> {
        self.require_product(product_id).await?;

        let reviews = self
            .reviews
            .list_by_product(product_id)
            .await
            .context("Failed to list product reviews")?;
        let average_rating = average(&reviews);

        Ok(ProductReviews {
            product_id,
            count: reviews.len(),
            average_rating,
            reviews,
        })
    }

    pub async fn get(&self, id: i64) -> Result<Review, ReviewServiceError> {
        self.reviews
            .get_by_id(id)
            .await
            .context("Failed to get review")?
            .ok_or_else(review_not_found)
    }

    /// Post a review. Name and email fall back to the author's account.
    pub async fn create(&self, author: &User, input: CreateReviewInput) -> Result<Review, ReviewServiceError> {
        validate_rating(input.rating)?;
        let message = input.message.trim().to_string();
        if message.is_empty() {
            return Err(ReviewServiceError::ValidationError("Message is required".to_string()));
        }

        let product = self.require_product(input.product_id).await?;
        let name = input
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| author.name.clone());
        let email = input
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| author.email.clone());

        if self
            .reviews
            .exists_for(product.id, &email)
            .await
            .context("Failed to check existing review")?
        {
            return Err(ReviewServiceError::AlreadyReviewed);
        }

        let now = Utc::now();
        let review = Review {
            id: 0,
            product_id: product.id,
            product_name: product.name,
            name,
            email,
            message,
            rating: input.rating,
            created_at: now,
            updated_at: now,
        };
        let created = match self.reviews.create(&review).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => return Err(ReviewServiceError::AlreadyReviewed),
            Err(e) => return Err(e.context("Failed to create review").into()),
        };

        self.refresh_rating(created.product_id).await?;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: UpdateReviewInput) -> Result<Review, ReviewServiceError> {
        let mut review = self.get(id).await?;

        if let Some(name) = input.name {
            review.name = name.trim().to_string();
        }
        if let Some(message) = input.message {
            let message = message.trim().to_string();
            if message.is_empty() {
                return Err(ReviewServiceError::ValidationError("Message is required".to_string()));
            }
            review.message = message;
        }
        if let Some(rating) = input.rating {
            validate_rating(rating)?;
            review.rating = rating;
        }

        let updated = self
            .reviews
            .update(&review)
            .await
            .context("Failed to update review")?;
        self.refresh_rating(updated.product_id).await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ReviewServiceError> {
        let review = self.get(id).await?;
        self.reviews.delete(id).await.context("Failed to delete review")?;
        self.refresh_rating(review.product_id).await?;
        Ok(())
    }

    /// Store the rounded average rating on the product
    async fn refresh_rating(&self, product_id: i64) -> Result<(), ReviewServiceError> {
        let average = self
            .reviews
            .average_rating(product_id)
            .await
            .context("Failed to average ratings")?
            .map(round1)
            .unwrap_or(0.0);

        self.products
            .set_rating(product_id, average)
            .await
            .context("Failed to store product rating")?;

        invalidate_responses(&self.cache, "products").await;
        invalidate_responses(&self.cache, "reviews").await;
        Ok(())
    }

    async fn require_product(&self, product_id: i64) -> Result<crate::models::Product, ReviewServiceError> {
        self.products
            .get_by_id(product_id)
            .await
            .context("Failed to get product")?
            .ok_or_else(|| ReviewServiceError::NotFound("Product not found".to_string()))
    }
}

fn average(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let sum: i64 = reviews.iter().map(|r| r.rating).sum();
    round1(sum as f64 / reviews.len() as f64)
}

fn validate_rating(rating: i64) -> Result<(), ReviewServiceError> {
    if !(1..=5).contains(&rating) {
        return Err(ReviewServiceError::ValidationError(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

fn review_not_found() -> ReviewServiceError {
    ReviewServiceError::NotFound("Review not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::product::test_support::sample_product;
    use crate::db::repositories::{SqlxProductRepository, SqlxReviewRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::UserRole;

    struct Fixture {
        service: ReviewService,
        products: Arc<dyn ProductRepository>,
        product_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let products = SqlxProductRepository::boxed(pool.clone());
        let product_id = products.create(&sample_product("R-1", 10.0, 1)).await.unwrap().id;
        let cache = Arc::new(Cache::Memory(MemoryCache::new()));
        Fixture {
            service: ReviewService::new(SqlxReviewRepository::boxed(pool), products.clone(), cache),
            products,
            product_id,
        }
    }

    fn author(email: &str) -> User {
        User::new("Reviewer".into(), email.into(), "hash".into(), UserRole::User)
    }

    fn input(product_id: i64, rating: i64) -> CreateReviewInput {
        CreateReviewInput {
            product_id,
            name: None,
            email: None,
            message: "Great".into(),
            rating,
        }
    }

    async fn product_rating(fx: &Fixture) -> f64 {
        fx.products.get_by_id(fx.product_id).await.unwrap().unwrap().rating
    }

    #[tokio::test]
    async fn test_create_defaults_to_author_and_updates_rating() {
        let fx = setup().await;
        let review = fx
            .service
            .create(&author("ada@example.com"), input(fx.product_id, 4))
            .await
            .unwrap();
        assert_eq!(review.email, "ada@example.com");
        assert_eq!(review.name, "Reviewer");
        assert_eq!(review.product_name, "Product R-1");

        fx.service
            .create(&author("bob@example.com"), input(fx.product_id, 5))
            .await
            .unwrap();
        fx.service
            .create(&author("cy@example.com"), input(fx.product_id, 5))
            .await
            .unwrap();
        assert_eq!(product_rating(&fx).await, 4.7);

        let listing = fx.service.list_by_product(fx.product_id).await.unwrap();
        assert_eq!(listing.count, 3);
        assert_eq!(listing.average_rating, 4.7);
    }

    #[tokio::test]
    async fn test_one_review_per_email() {
        let fx = setup().await;
        fx.service
            .create(&author("ada@example.com"), input(fx.product_id, 4))
            .await
            .unwrap();

        let mut again = input(fx.product_id, 2);
        again.email = Some("ADA@example.com".into());
        assert!(matches!(
            fx.service.create(&author("other@example.com"), again).await,
            Err(ReviewServiceError::AlreadyReviewed)
        ));
    }

    #[tokio::test]
    async fn test_validation_and_missing_product() {
        let fx = setup().await;
        assert!(matches!(
            fx.service.create(&author("a@example.com"), input(fx.product_id, 6)).await,
            Err(ReviewServiceError::ValidationError(_))
        ));
        let err = fx
            .service
            .create(&author("a@example.com"), input(9999, 3))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Product not found");
        assert!(fx.service.list_by_product(9999).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_delete_recompute_rating() {
        let fx = setup().await;
        let review = fx
            .service
            .create(&author("ada@example.com"), input(fx.product_id, 2))
            .await
            .unwrap();

        fx.service
            .update(
                review.id,
                UpdateReviewInput {
                    rating: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(product_rating(&fx).await, 5.0);

        fx.service.delete(review.id).await.unwrap();
        assert_eq!(product_rating(&fx).await, 0.0);
        assert!(matches!(
            fx.service.get(review.id).await,
            Err(ReviewServiceError::NotFound(_))
        ));
    }
}
