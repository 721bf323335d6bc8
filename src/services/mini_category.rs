//! Minicategory service
//!
//! The third taxonomy level. A minicategory names both its category and its
//! subcategory, and the pair must exist.

use crate::cache::{invalidate_responses, Cache};
use crate::db::is_unique_violation;
use crate::db::repositories::{CategoryRepository, MiniCategoryRepository, SubCategoryRepository};
use crate::models::{MiniCategory, MiniCategoryInput};
use crate::services::category::{required_name, validated_image, validated_sort_order, CategoryServiceError};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

pub struct MiniCategoryService {
    repo: Arc<dyn MiniCategoryRepository>,
    categories: Arc<dyn CategoryRepository>,
    sub_categories: Arc<dyn SubCategoryRepository>,
    cache: Arc<Cache>,
}

impl MiniCategoryService {
    pub fn new(
        repo: Arc<dyn MiniCategoryRepository>,
        categories: Arc<dyn CategoryRepository>,
        sub_categories: Arc<dyn SubCategoryRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            categories,
            sub_categories,
            cache,
        }
    }

    pub async fn list(&self) -> Result<Vec<MiniCategory>, CategoryServiceError> {
        let list = self.repo.list().await.context("Failed to list minicategories")?;
        Ok(list)
    }

    pub async fn list_active_by_parent(
        &self,
        category: &str,
        sub_category: &str,
    ) -> Result<Vec<MiniCategory>, CategoryServiceError> {
        let list = self
            .repo
            .list_active_by_parent(category, sub_category)
            .await
            .context("Failed to list minicategories by parent")?;
        Ok(list)
    }

    pub async fn get(&self, id: i64) -> Result<MiniCategory, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get minicategory")?
            .ok_or_else(not_found)
    }

    pub async fn create(&self, input: MiniCategoryInput) -> Result<MiniCategory, CategoryServiceError> {
        let name = required_name(input.name)?;
        let (category, sub_category) = self.resolve_parents(input.category, input.sub_category).await?;
        let image = validated_image(input.image)?;
        let sort_order = validated_sort_order(input.sort_order)?.unwrap_or(0);

        if self
            .repo
            .find(&name, &category, &sub_category)
            .await
            .context("Failed to check minicategory name")?
            .is_some()
        {
            return Err(duplicate());
        }

        let now = Utc::now();
        let mini = MiniCategory {
            id: 0,
            name,
            category,
            sub_category,
            image,
            sort_order,
            status: input.status.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        let created = match self.repo.create(&mini).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => return Err(duplicate()),
            Err(e) => return Err(e.context("Failed to create minicategory").into()),
        };
        invalidate_responses(&self.cache, "minicategories").await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: MiniCategoryInput) -> Result<MiniCategory, CategoryServiceError> {
        let mut mini = self.get(id).await?;

        if let Some(name) = input.name {
            mini.name = required_name(Some(name))?;
        }
        if input.category.is_some() || input.sub_category.is_some() {
            let category = input.category.or_else(|| Some(mini.category.clone()));
            let sub_category = input.sub_category.or_else(|| Some(mini.sub_category.clone()));
            let (category, sub_category) = self.resolve_parents(category, sub_category).await?;
            mini.category = category;
            mini.sub_category = sub_category;
        }
        if input.image.is_some() {
            mini.image = validated_image(input.image)?;
        }
        if let Some(sort_order) = validated_sort_order(input.sort_order)? {
            mini.sort_order = sort_order;
        }
        if let Some(status) = input.status {
            mini.status = status;
        }

        let clash = self
            .repo
            .find(&mini.name, &mini.category, &mini.sub_category)
            .await
            .context("Failed to check minicategory name")?;
        if clash.is_some_and(|other| other.id != id) {
            return Err(duplicate());
        }

        let updated = match self.repo.update(&mini).await {
            Ok(updated) => updated,
            Err(e) if is_unique_violation(&e) => return Err(duplicate()),
            Err(e) => return Err(e.context("Failed to update minicategory").into()),
        };
        invalidate_responses(&self.cache, "minicategories").await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete minicategory")?;
        if !deleted {
            return Err(not_found());
        }
        invalidate_responses(&self.cache, "minicategories").await;
        Ok(())
    }

    /// Check that the category exists and owns the subcategory; returns
    /// both names in their stored spelling
    async fn resolve_parents(
        &self,
        category: Option<String>,
        sub_category: Option<String>,
    ) -> Result<(String, String), CategoryServiceError> {
        let required = |value: Option<String>, what: &str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CategoryServiceError::ValidationError(format!("{} is required", what)))
        };
        let category = required(category, "Category")?;
        let sub_category = required(sub_category, "SubCategory")?;

        let category = self
            .categories
            .get_by_name(&category)
            .await
            .context("Failed to look up category")?
            .ok_or_else(|| CategoryServiceError::ValidationError("Category does not exist".to_string()))?;

        let sub = self
            .sub_categories
            .find(&sub_category, &category.name)
            .await
            .context("Failed to look up subcategory")?
            .ok_or_else(|| {
                CategoryServiceError::ValidationError(
                    "SubCategory does not exist in the specified category".to_string(),
                )
            })?;

        Ok((category.name, sub.name))
    }
}

fn not_found() -> CategoryServiceError {
    CategoryServiceError::NotFound("MiniCategory not found".to_string())
}

fn duplicate() -> CategoryServiceError {
    CategoryServiceError::Duplicate(
        "MiniCategory with this name already exists in the specified category and subcategory".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::{SqlxCategoryRepository, SqlxMiniCategoryRepository, SqlxSubCategoryRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CategoryInput, SubCategoryInput};
    use crate::services::{CategoryService, SubCategoryService};

    async fn setup() -> MiniCategoryService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let cache = Arc::new(Cache::Memory(MemoryCache::new()));
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let subs = SqlxSubCategoryRepository::boxed(pool.clone());

        for name in ["Shoes", "Bags"] {
            CategoryService::new(categories.clone(), cache.clone())
                .create(CategoryInput {
                    name: Some(name.into()),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        SubCategoryService::new(subs.clone(), categories.clone(), cache.clone())
            .create(SubCategoryInput {
                name: Some("Running".into()),
                category: Some("Shoes".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        MiniCategoryService::new(SqlxMiniCategoryRepository::boxed(pool), categories, subs, cache)
    }

    fn input(name: &str, category: &str, sub: &str) -> MiniCategoryInput {
        MiniCategoryInput {
            name: Some(name.into()),
            category: Some(category.into()),
            sub_category: Some(sub.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_resolves_parent_names() {
        let service = setup().await;
        let mini = service.create(input("Trail", "shoes", "running")).await.unwrap();
        assert_eq!(mini.category, "Shoes");
        assert_eq!(mini.sub_category, "Running");
        assert!(mini.status);

        let listed = service.list_active_by_parent("Shoes", "Running").await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_subcategory_must_belong_to_category() {
        let service = setup().await;
        let err = service.create(input("Trail", "Bags", "Running")).await.unwrap_err();
        assert_eq!(err.to_string(), "SubCategory does not exist in the specified category");

        let err = service.create(input("Trail", "Hats", "Running")).await.unwrap_err();
        assert_eq!(err.to_string(), "Category does not exist");
    }

    #[tokio::test]
    async fn test_duplicate_and_delete() {
        let service = setup().await;
        let mini = service.create(input("Trail", "Shoes", "Running")).await.unwrap();
        assert!(matches!(
            service.create(input("TRAIL", "Shoes", "Running")).await,
            Err(CategoryServiceError::Duplicate(_))
        ));

        let hidden = service
            .update(
                mini.id,
                MiniCategoryInput {
                    status: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!hidden.status);
        assert!(service.list_active_by_parent("Shoes", "Running").await.unwrap().is_empty());

        service.delete(mini.id).await.unwrap();
        assert!(matches!(service.delete(mini.id).await, Err(CategoryServiceError::NotFound(_))));
    }
}
