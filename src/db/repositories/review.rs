//! Review repository

use crate::db::DynDatabasePool;
use crate::models::Review;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn create(&self, review: &Review) -> Result<Review>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Review>>;

    /// All reviews, newest first
    async fn list(&self) -> Result<Vec<Review>>;

    async fn list_by_product(&self, product_id: i64) -> Result<Vec<Review>>;

    /// Whether `email` already reviewed the product
    async fn exists_for(&self, product_id: i64, email: &str) -> Result<bool>;

    async fn update(&self, review: &Review) -> Result<Review>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Mean rating of a product, `None` when it has no reviews
    async fn average_rating(&self, product_id: i64) -> Result<Option<f64>>;
}

pub struct SqlxReviewRepository {
    pool: DynDatabasePool,
}

impl SqlxReviewRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ReviewRepository> {
        Arc::new(Self::new(pool))
    }
}

const REVIEW_COLUMNS: &str = "id, product_id, product_name, name, email, message, rating, created_at, updated_at";

#[async_trait]
impl ReviewRepository for SqlxReviewRepository {
    async fn create(&self, review: &Review) -> Result<Review> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO reviews (product_id, product_name, name, email, message, rating, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(review.product_id)
        .bind(&review.product_name)
        .bind(&review.name)
        .bind(review.email.to_lowercase())
        .bind(&review.message)
        .bind(review.rating)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create review")?;

        Ok(Review {
            id: result.last_insert_rowid(),
            email: review.email.to_lowercase(),
            created_at: now,
            updated_at: now,
            ..review.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Review>> {
        get_review_by_id(self.pool.sqlite(), id).await
    }

    async fn list(&self) -> Result<Vec<Review>> {
        let sql = format!("SELECT {} FROM reviews ORDER BY created_at DESC, id DESC", REVIEW_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list reviews")?;
        Ok(rows.iter().map(row_to_review).collect())
    }

    async fn list_by_product(&self, product_id: i64) -> Result<Vec<Review>> {
        let sql = format!(
            "SELECT {} FROM reviews WHERE product_id = ? ORDER BY created_at DESC, id DESC",
            REVIEW_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(product_id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list product reviews")?;
        Ok(rows.iter().map(row_to_review).collect())
    }

    async fn exists_for(&self, product_id: i64, email: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM reviews WHERE product_id = ? AND email = ?")
            .bind(product_id)
            .bind(email.trim().to_lowercase())
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to check existing review")?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn update(&self, review: &Review) -> Result<Review> {
        sqlx::query("UPDATE reviews SET name = ?, message = ?, rating = ?, updated_at = ? WHERE id = ?")
            .bind(&review.name)
            .bind(&review.message)
            .bind(review.rating)
            .bind(Utc::now())
            .bind(review.id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update review")?;

        get_review_by_id(self.pool.sqlite(), review.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Review not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete review")?;
        Ok(result.rows_affected() > 0)
    }

    async fn average_rating(&self, product_id: i64) -> Result<Option<f64>> {
        let row = sqlx::query("SELECT AVG(rating) as average FROM reviews WHERE product_id = ?")
            .bind(product_id)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to average review ratings")?;
        Ok(row.get("average"))
    }
}

async fn get_review_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Review>> {
    let sql = format!("SELECT {} FROM reviews WHERE id = ?", REVIEW_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get review by ID")?;
    Ok(row.as_ref().map(row_to_review))
}

fn row_to_review(row: &sqlx::sqlite::SqliteRow) -> Review {
    Review {
        id: row.get("id"),
        product_id: row.get("product_id"),
        product_name: row.get("product_name"),
        name: row.get("name"),
        email: row.get("email"),
        message: row.get("message"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::product::test_support::sample_product;
    use crate::db::repositories::{ProductRepository, SqlxProductRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (SqlxReviewRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let product = SqlxProductRepository::new(pool.clone())
            .create(&sample_product("R1", 1.0, 1))
            .await
            .unwrap();
        (SqlxReviewRepository::new(pool), product.id)
    }

    fn review(product_id: i64, email: &str, rating: i64) -> Review {
        let now = Utc::now();
        Review {
            id: 0,
            product_id,
            product_name: "Product R1".into(),
            name: "Reviewer".into(),
            email: email.into(),
            message: "Nice".into(),
            rating,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_average_rating() {
        let (repo, product_id) = setup().await;
        assert_eq!(repo.average_rating(product_id).await.unwrap(), None);

        repo.create(&review(product_id, "a@example.com", 4)).await.unwrap();
        repo.create(&review(product_id, "b@example.com", 5)).await.unwrap();

        assert_eq!(repo.average_rating(product_id).await.unwrap(), Some(4.5));
        assert_eq!(repo.list_by_product(product_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_one_review_per_email() {
        let (repo, product_id) = setup().await;
        repo.create(&review(product_id, "a@example.com", 4)).await.unwrap();

        assert!(repo.exists_for(product_id, "A@example.com").await.unwrap());
        let err = repo.create(&review(product_id, "A@Example.com", 2)).await.unwrap_err();
        assert!(crate::db::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_update_and_delete_review() {
        let (repo, product_id) = setup().await;
        let mut created = repo.create(&review(product_id, "a@example.com", 1)).await.unwrap();

        created.rating = 3;
        created.message = "Better now".into();
        let updated = repo.update(&created).await.unwrap();
        assert_eq!(updated.rating, 3);
        assert_eq!(updated.message, "Better now");

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }
}
