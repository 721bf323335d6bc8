//! Banner service
//!
//! Banners carry a short numeric id drawn from the `bannerId` sequence
//! rather than the row id, so admins can refer to them by number.

use crate::cache::{invalidate_responses, Cache};
use crate::db::repositories::{BannerRepository, CounterRepository, BANNER_ID_SEQUENCE};
use crate::models::{Banner, BannerInput};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum BannerServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct BannerService {
    repo: Arc<dyn BannerRepository>,
    counters: Arc<dyn CounterRepository>,
    cache: Arc<Cache>,
}

impl BannerService {
    pub fn new(repo: Arc<dyn BannerRepository>, counters: Arc<dyn CounterRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, counters, cache }
    }

    /// Every banner by sort order (admin view)
    pub async fn list(&self) -> Result<Vec<Banner>, BannerServiceError> {
        let banners = self.repo.list(false).await.context("Failed to list banners")?;
        Ok(banners)
    }

    /// Active banners by sort order
    pub async fn list_public(&self) -> Result<Vec<Banner>, BannerServiceError> {
        let banners = self.repo.list(true).await.context("Failed to list active banners")?;
        Ok(banners)
    }

    pub async fn get(&self, id: i64) -> Result<Banner, BannerServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get banner")?
            .ok_or_else(not_found)
    }

    pub async fn create(&self, input: BannerInput) -> Result<Banner, BannerServiceError> {
        let background_image = required_text(input.background_image, "Background image")?;
        let category = required_text(input.category, "Category")?;
        let discount = input
            .discount
            .ok_or_else(|| BannerServiceError::ValidationError("Discount is required".to_string()))?;
        let fields = PromoFields::validate(discount, input.sort_order.unwrap_or(0))
            .map_err(BannerServiceError::ValidationError)?;

        let id = self
            .counters
            .next_value(BANNER_ID_SEQUENCE)
            .await
            .context("Failed to allocate banner id")?;

        let now = Utc::now();
        let banner = Banner {
            id,
            background_image,
            category,
            discount: fields.discount,
            sort_order: fields.sort_order,
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        let created = self.repo.create(&banner).await.context("Failed to create banner")?;

        tracing::info!("Created banner {}", created.id);
        invalidate_responses(&self.cache, "banners").await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: BannerInput) -> Result<Banner, BannerServiceError> {
        let mut banner = self.get(id).await?;

        if input.background_image.is_some() {
            banner.background_image = required_text(input.background_image, "Background image")?;
        }
        if input.category.is_some() {
            banner.category = required_text(input.category, "Category")?;
        }
        let fields = PromoFields::validate(
            input.discount.unwrap_or(banner.discount),
            input.sort_order.unwrap_or(banner.sort_order),
        )
        .map_err(BannerServiceError::ValidationError)?;
        banner.discount = fields.discount;
        banner.sort_order = fields.sort_order;
        if let Some(is_active) = input.is_active {
            banner.is_active = is_active;
        }

        let updated = self.repo.update(&banner).await.context("Failed to update banner")?;
        invalidate_responses(&self.cache, "banners").await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), BannerServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete banner")? {
            return Err(not_found());
        }
        invalidate_responses(&self.cache, "banners").await;
        Ok(())
    }
}

/// Discount and ordering rules shared by banners and hero sliders
pub(crate) struct PromoFields {
    pub discount: f64,
    pub sort_order: i64,
}

impl PromoFields {
    pub(crate) fn validate(discount: f64, sort_order: i64) -> Result<Self, String> {
        if !(0.0..=100.0).contains(&discount) {
            return Err("Discount must be between 0 and 100".to_string());
        }
        if sort_order < 0 {
            return Err("Sort order cannot be negative".to_string());
        }
        Ok(Self { discount, sort_order })
    }
}

fn required_text(value: Option<String>, what: &str) -> Result<String, BannerServiceError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BannerServiceError::ValidationError(format!("{} is required", what)))
}

fn not_found() -> BannerServiceError {
    BannerServiceError::NotFound("Banner not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::{SqlxBannerRepository, SqlxCounterRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> BannerService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        BannerService::new(
            SqlxBannerRepository::boxed(pool.clone()),
            SqlxCounterRepository::boxed(pool),
            Arc::new(Cache::Memory(MemoryCache::new())),
        )
    }

    fn input(sort_order: i64) -> BannerInput {
        BannerInput {
            background_image: Some("https://cdn.example.com/banner.jpg".into()),
            category: Some("Shoes".into()),
            discount: Some(25.0),
            sort_order: Some(sort_order),
            is_active: None,
        }
    }

    #[tokio::test]
    async fn test_ids_come_from_sequence() {
        let service = setup().await;
        let first = service.create(input(1)).await.unwrap();
        let second = service.create(input(0)).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        service.delete(second.id).await.unwrap();
        let third = service.create(input(0)).await.unwrap();
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn test_public_list_only_active_by_sort_order() {
        let service = setup().await;
        let hidden = service.create(input(0)).await.unwrap();
        service.create(input(5)).await.unwrap();
        service.create(input(2)).await.unwrap();

        service
            .update(
                hidden.id,
                BannerInput {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let orders: Vec<i64> = service
            .list_public()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.sort_order)
            .collect();
        assert_eq!(orders, vec![2, 5]);
        assert_eq!(service.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_validation() {
        let service = setup().await;
        let mut bad = input(0);
        bad.discount = Some(101.0);
        assert!(matches!(
            service.create(bad).await,
            Err(BannerServiceError::ValidationError(_))
        ));

        let mut missing = input(0);
        missing.category = None;
        assert!(service.create(missing).await.is_err());

        let err = service.get(42).await.unwrap_err();
        assert_eq!(err.to_string(), "Banner not found");
    }
}
