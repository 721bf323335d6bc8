//! Subcategory service
//!
//! A subcategory names its parent category. The parent must exist and the
//! stored name is the parent's own spelling.

use crate::cache::{invalidate_responses, Cache};
use crate::db::is_unique_violation;
use crate::db::repositories::{CategoryRepository, SubCategoryRepository};
use crate::models::{SubCategory, SubCategoryInput};
use crate::services::category::{required_name, validated_sort_order, CategoryServiceError};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

pub struct SubCategoryService {
    repo: Arc<dyn SubCategoryRepository>,
    categories: Arc<dyn CategoryRepository>,
    cache: Arc<Cache>,
}

impl SubCategoryService {
    pub fn new(
        repo: Arc<dyn SubCategoryRepository>,
        categories: Arc<dyn CategoryRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            categories,
            cache,
        }
    }

    pub async fn list(&self) -> Result<Vec<SubCategory>, CategoryServiceError> {
        let list = self.repo.list().await.context("Failed to list subcategories")?;
        Ok(list)
    }

    /// Active subcategories of the named category (any case)
    pub async fn list_active_by_category(&self, category: &str) -> Result<Vec<SubCategory>, CategoryServiceError> {
        let list = self
            .repo
            .list_active_by_category(category)
            .await
            .context("Failed to list subcategories by category")?;
        Ok(list)
    }

    pub async fn get(&self, id: i64) -> Result<SubCategory, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get subcategory")?
            .ok_or_else(not_found)
    }

    pub async fn create(&self, input: SubCategoryInput) -> Result<SubCategory, CategoryServiceError> {
        let name = required_name(input.name)?;
        let category = self.canonical_category(input.category).await?;
        let sort_order = validated_sort_order(input.sort_order)?.unwrap_or(0);

        if self
            .repo
            .find(&name, &category)
            .await
            .context("Failed to check subcategory name")?
            .is_some()
        {
            return Err(duplicate());
        }

        let now = Utc::now();
        let sub = SubCategory {
            id: 0,
            name,
            category,
            sort_order,
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        let created = match self.repo.create(&sub).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => return Err(duplicate()),
            Err(e) => return Err(e.context("Failed to create subcategory").into()),
        };
        invalidate_responses(&self.cache, "subcategories").await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: SubCategoryInput) -> Result<SubCategory, CategoryServiceError> {
        let mut sub = self.get(id).await?;

        if let Some(name) = input.name {
            sub.name = required_name(Some(name))?;
        }
        if input.category.is_some() {
            sub.category = self.canonical_category(input.category).await?;
        }
        if let Some(sort_order) = validated_sort_order(input.sort_order)? {
            sub.sort_order = sort_order;
        }
        if let Some(is_active) = input.is_active {
            sub.is_active = is_active;
        }

        let clash = self
            .repo
            .find(&sub.name, &sub.category)
            .await
            .context("Failed to check subcategory name")?;
        if clash.is_some_and(|other| other.id != id) {
            return Err(duplicate());
        }

        let updated = match self.repo.update(&sub).await {
            Ok(updated) => updated,
            Err(e) if is_unique_violation(&e) => return Err(duplicate()),
            Err(e) => return Err(e.context("Failed to update subcategory").into()),
        };
        invalidate_responses(&self.cache, "subcategories").await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete subcategory")?;
        if !deleted {
            return Err(not_found());
        }
        invalidate_responses(&self.cache, "subcategories").await;
        Ok(())
    }

    /// Resolve a category name to the stored spelling
    async fn canonical_category(&self, category: Option<String>) -> Result<String, CategoryServiceError> {
        let requested = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| CategoryServiceError::ValidationError("Category is required".to_string()))?;

        let found = self
            .categories
            .get_by_name(&requested)
            .await
            .context("Failed to look up category")?
            .ok_or_else(|| CategoryServiceError::ValidationError("Category does not exist".to_string()))?;
        Ok(found.name)
    }
}

fn not_found() -> CategoryServiceError {
    CategoryServiceError::NotFound("SubCategory not found".to_string())
}

fn duplicate() -> CategoryServiceError {
    CategoryServiceError::Duplicate("SubCategory with this name already exists in the selected category".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::{SqlxCategoryRepository, SqlxSubCategoryRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::services::CategoryService;
    use crate::models::CategoryInput;

    async fn setup() -> SubCategoryService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let cache = Arc::new(Cache::Memory(MemoryCache::new()));
        let categories = SqlxCategoryRepository::boxed(pool.clone());

        CategoryService::new(categories.clone(), cache.clone())
            .create(CategoryInput {
                name: Some("Shoes".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        SubCategoryService::new(SqlxSubCategoryRepository::boxed(pool), categories, cache)
    }

    fn input(name: &str, category: &str) -> SubCategoryInput {
        SubCategoryInput {
            name: Some(name.into()),
            category: Some(category.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_uses_canonical_category_name() {
        let service = setup().await;
        let sub = service.create(input("Running", "shoes")).await.unwrap();
        assert_eq!(sub.category, "Shoes");
        assert_eq!(service.list_active_by_category("SHOES").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_category_is_rejected() {
        let service = setup().await;
        let err = service.create(input("Running", "Hats")).await.unwrap_err();
        assert_eq!(err.to_string(), "Category does not exist");
    }

    #[tokio::test]
    async fn test_duplicate_within_category() {
        let service = setup().await;
        let first = service.create(input("Running", "Shoes")).await.unwrap();
        let second = service.create(input("Hiking", "Shoes")).await.unwrap();

        assert!(matches!(
            service.create(input("running", "Shoes")).await,
            Err(CategoryServiceError::Duplicate(_))
        ));
        assert!(matches!(
            service
                .update(
                    second.id,
                    SubCategoryInput {
                        name: Some("Running".into()),
                        ..Default::default()
                    }
                )
                .await,
            Err(CategoryServiceError::Duplicate(_))
        ));

        let renamed = service
            .update(
                first.id,
                SubCategoryInput {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!renamed.is_active);
        assert_eq!(service.list_active_by_category("Shoes").await.unwrap().len(), 1);

        service.delete(first.id).await.unwrap();
        assert!(service.get(first.id).await.is_err());
    }
}
