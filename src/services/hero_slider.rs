//! Hero slider service

use crate::cache::{invalidate_responses, Cache};
use crate::db::repositories::HeroSliderRepository;
use crate::models::{is_image_data_url, HeroSlider, HeroSliderInput};
use crate::services::banner::PromoFields;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum HeroSliderServiceError {
    #[error("Hero slider not found")]
    NotFound,

    #[error("{0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct HeroSliderService {
    repo: Arc<dyn HeroSliderRepository>,
    cache: Arc<Cache>,
}

impl HeroSliderService {
    pub fn new(repo: Arc<dyn HeroSliderRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<HeroSlider>, HeroSliderServiceError> {
        let sliders = self.repo.list(active_only).await.context("Failed to list hero sliders")?;
        Ok(sliders)
    }

    pub async fn get(&self, id: i64) -> Result<HeroSlider, HeroSliderServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get hero slider")?
            .ok_or(HeroSliderServiceError::NotFound)
    }

    /// Public lookup: inactive sliders are reported as missing
    pub async fn get_active(&self, id: i64) -> Result<HeroSlider, HeroSliderServiceError> {
        let slider = self.get(id).await?;
        if !slider.is_active {
            return Err(HeroSliderServiceError::NotFound);
        }
        Ok(slider)
    }

    pub async fn create(&self, input: HeroSliderInput) -> Result<HeroSlider, HeroSliderServiceError> {
        let background_image = validated_background(input.background_image)?;
        let category = input.category.map(|c| c.trim().to_string()).unwrap_or_default();
        let (false, Some(discount)) = (category.is_empty(), input.discount) else {
            return Err(HeroSliderServiceError::ValidationError(
                "Category and discount are required".to_string(),
            ));
        };
        let fields = PromoFields::validate(discount, input.sort_order.unwrap_or(0))
            .map_err(HeroSliderServiceError::ValidationError)?;

        let now = Utc::now();
        let slider = HeroSlider {
            id: 0,
            background_image,
            category,
            discount: fields.discount,
            sort_order: fields.sort_order,
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&slider).await.context("Failed to create hero slider")?;
        invalidate_responses(&self.cache, "hero-sliders").await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: HeroSliderInput) -> Result<HeroSlider, HeroSliderServiceError> {
        let mut slider = self.get(id).await?;

        if input.background_image.is_some() {
            slider.background_image = validated_background(input.background_image)?;
        }
        if let Some(category) = input.category {
            let category = category.trim().to_string();
            if category.is_empty() {
                return Err(HeroSliderServiceError::ValidationError(
                    "Category and discount are required".to_string(),
                ));
            }
            slider.category = category;
        }
        let fields = PromoFields::validate(
            input.discount.unwrap_or(slider.discount),
            input.sort_order.unwrap_or(slider.sort_order),
        )
        .map_err(HeroSliderServiceError::ValidationError)?;
        slider.discount = fields.discount;
        slider.sort_order = fields.sort_order;
        if let Some(is_active) = input.is_active {
            slider.is_active = is_active;
        }

        let updated = self.repo.update(&slider).await.context("Failed to update hero slider")?;
        invalidate_responses(&self.cache, "hero-sliders").await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), HeroSliderServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete hero slider")? {
            return Err(HeroSliderServiceError::NotFound);
        }
        invalidate_responses(&self.cache, "hero-sliders").await;
        Ok(())
    }
}

fn validated_background(image: Option<String>) -> Result<String, HeroSliderServiceError> {
    match image.map(|i| i.trim().to_string()) {
        Some(i) if is_image_data_url(&i) => Ok(i),
        _ => Err(HeroSliderServiceError::ValidationError(
            "Background image must be a valid base64 encoded image starting with data:image/".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxHeroSliderRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> HeroSliderService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        HeroSliderService::new(
            SqlxHeroSliderRepository::boxed(pool),
            Arc::new(Cache::Memory(MemoryCache::new())),
        )
    }

    fn input() -> HeroSliderInput {
        HeroSliderInput {
            background_image: Some("data:image/png;base64,AA==".into()),
            category: Some("Shoes".into()),
            discount: Some(30.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_requires_image_data_url() {
        let service = setup().await;
        let mut bad = input();
        bad.background_image = Some("https://example.com/slide.png".into());
        let err = service.create(bad).await.unwrap_err();
        assert!(err.to_string().starts_with("Background image must be"));

        let mut no_discount = input();
        no_discount.discount = None;
        let err = service.create(no_discount).await.unwrap_err();
        assert_eq!(err.to_string(), "Category and discount are required");
    }

    #[tokio::test]
    async fn test_inactive_slider_hidden_from_public() {
        let service = setup().await;
        let slider = service.create(input()).await.unwrap();
        assert!(service.get_active(slider.id).await.is_ok());

        service
            .update(
                slider.id,
                HeroSliderInput {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(matches!(
            service.get_active(slider.id).await,
            Err(HeroSliderServiceError::NotFound)
        ));
        assert!(service.list(true).await.unwrap().is_empty());
        assert_eq!(service.list(false).await.unwrap().len(), 1);

        service.delete(slider.id).await.unwrap();
        assert!(matches!(service.get(slider.id).await, Err(HeroSliderServiceError::NotFound)));
    }
}
