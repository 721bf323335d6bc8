//! Category service
//!
//! Top-level catalogue categories. Lookups by id and the full list are
//! memoised in the cache layer and dropped on every write, together with
//! any cached HTTP responses that mention categories.

use crate::cache::{invalidate_responses, Cache, CacheLayer};
use crate::db::is_unique_violation;
use crate::db::repositories::CategoryRepository;
use crate::models::{is_image_data_url, Category, CategoryInput};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Default cache TTL for categories (1 hour)
const CATEGORY_CACHE_TTL_SECS: u64 = 3600;

const CACHE_KEY_CATEGORY_BY_ID: &str = "category:id:";
const CACHE_KEY_CATEGORY_LIST: &str = "category:list";

/// Error type shared by the category, subcategory and minicategory services
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),

    /// Name (or name within its parent) already taken
    #[error("{0}")]
    Duplicate(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, cache: Arc<Cache>) -> Self {
        Self::with_cache_ttl(repo, cache, Duration::from_secs(CATEGORY_CACHE_TTL_SECS))
    }

    pub fn with_cache_ttl(repo: Arc<dyn CategoryRepository>, cache: Arc<Cache>, cache_ttl: Duration) -> Self {
        Self { repo, cache, cache_ttl }
    }

    /// All categories by sort order
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        if let Some(list) = self
            .cache
            .get::<Vec<Category>>(CACHE_KEY_CATEGORY_LIST)
            .await
            .ok()
            .flatten()
        {
            return Ok(list);
        }

        let list = self.repo.list().await.context("Failed to list categories")?;
        if let Err(e) = self.cache.set(CACHE_KEY_CATEGORY_LIST, &list, self.cache_ttl).await {
            tracing::debug!("Failed to cache category list: {}", e);
        }
        Ok(list)
    }

    pub async fn get(&self, id: i64) -> Result<Category, CategoryServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_CATEGORY_BY_ID, id);
        if let Some(category) = self.cache.get::<Category>(&cache_key).await.ok().flatten() {
            return Ok(category);
        }

        let category = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get category by ID")?
            .ok_or_else(not_found)?;

        if let Err(e) = self.cache.set(&cache_key, &category, self.cache_ttl).await {
            tracing::debug!("Failed to cache category {}: {}", id, e);
        }
        Ok(category)
    }

    pub async fn create(&self, input: CategoryInput) -> Result<Category, CategoryServiceError> {
        let name = required_name(input.name)?;
        let image = validated_image(input.image)?;
        let sort_order = validated_sort_order(input.sort_order)?.unwrap_or(0);

        if self
            .repo
            .exists_by_name(&name, None)
            .await
            .context("Failed to check name uniqueness")?
        {
            return Err(duplicate());
        }

        let now = Utc::now();
        let category = Category {
            id: 0,
            name,
            image,
            sort_order,
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        let created = match self.repo.create(&category).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => return Err(duplicate()),
            Err(e) => return Err(e.context("Failed to create category").into()),
        };

        self.invalidate_cache().await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: CategoryInput) -> Result<Category, CategoryServiceError> {
        let mut category = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get category by ID")?
            .ok_or_else(not_found)?;

        if let Some(name) = input.name {
            let name = required_name(Some(name))?;
            if self
                .repo
                .exists_by_name(&name, Some(id))
                .await
                .context("Failed to check name uniqueness")?
            {
                return Err(duplicate());
            }
            category.name = name;
        }
        if input.image.is_some() {
            category.image = validated_image(input.image)?;
        }
        if let Some(sort_order) = validated_sort_order(input.sort_order)? {
            category.sort_order = sort_order;
        }
        if let Some(is_active) = input.is_active {
            category.is_active = is_active;
        }

        let updated = match self.repo.update(&category).await {
            Ok(updated) => updated,
            Err(e) if is_unique_violation(&e) => return Err(duplicate()),
            Err(e) => return Err(e.context("Failed to update category").into()),
        };

        self.invalidate_cache().await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete category")?;
        if !deleted {
            return Err(not_found());
        }
        self.invalidate_cache().await;
        Ok(())
    }

    async fn invalidate_cache(&self) {
        if let Err(e) = self.cache.delete_pattern("category:*").await {
            tracing::warn!("Failed to invalidate category cache: {}", e);
        }
        invalidate_responses(&self.cache, "categories").await;
    }
}

fn not_found() -> CategoryServiceError {
    CategoryServiceError::NotFound("Category not found".to_string())
}

fn duplicate() -> CategoryServiceError {
    CategoryServiceError::Duplicate("Category with this name already exists".to_string())
}

/// Trimmed, non-empty name
pub(crate) fn required_name(name: Option<String>) -> Result<String, CategoryServiceError> {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| CategoryServiceError::ValidationError("Name is required".to_string()))
}

/// Blank images clear the field; anything else must be an image data URL
pub(crate) fn validated_image(image: Option<String>) -> Result<Option<String>, CategoryServiceError> {
    match image.map(|i| i.trim().to_string()) {
        None => Ok(None),
        Some(i) if i.is_empty() => Ok(None),
        Some(i) if is_image_data_url(&i) => Ok(Some(i)),
        Some(_) => Err(CategoryServiceError::ValidationError(
            "Image must be a valid base64 encoded image starting with data:image/".to_string(),
        )),
    }
}

pub(crate) fn validated_sort_order(sort_order: Option<i64>) -> Result<Option<i64>, CategoryServiceError> {
    match sort_order {
        Some(n) if n < 0 => Err(CategoryServiceError::ValidationError(
            "Sort order cannot be negative".to_string(),
        )),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxCategoryRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> CategoryService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let cache = Arc::new(Cache::Memory(MemoryCache::new()));
        CategoryService::new(SqlxCategoryRepository::boxed(pool), cache)
    }

    fn named(name: &str) -> CategoryInput {
        CategoryInput {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_duplicate_name_ignores_case() {
        let service = setup_test_service().await;
        let created = service.create(named("Shoes")).await.unwrap();
        assert!(created.is_active);
        assert_eq!(created.sort_order, 0);

        let err = service.create(named("SHOES")).await.unwrap_err();
        assert!(matches!(err, CategoryServiceError::Duplicate(_)));
        assert_eq!(err.to_string(), "Category with this name already exists");
    }

    #[tokio::test]
    async fn test_image_must_be_data_url() {
        let service = setup_test_service().await;
        let mut input = named("Bags");
        input.image = Some("https://example.com/bag.png".into());
        assert!(matches!(
            service.create(input).await,
            Err(CategoryServiceError::ValidationError(_))
        ));

        let mut input = named("Bags");
        input.image = Some("data:image/png;base64,AA==".into());
        assert!(service.create(input).await.unwrap().image.is_some());
    }

    #[tokio::test]
    async fn test_cached_list_is_refreshed_after_write() {
        let service = setup_test_service().await;
        service.create(named("B")).await.unwrap();
        assert_eq!(service.list().await.unwrap().len(), 1);

        let second = service.create(named("A")).await.unwrap();
        assert_eq!(service.list().await.unwrap().len(), 2);

        assert_eq!(service.get(second.id).await.unwrap().name, "A");
        service
            .update(
                second.id,
                CategoryInput {
                    name: Some("A2".into()),
                    sort_order: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(service.get(second.id).await.unwrap().name, "A2");

        service.delete(second.id).await.unwrap();
        assert!(matches!(
            service.get(second.id).await,
            Err(CategoryServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_rejects_taken_name_and_negative_sort() {
        let service = setup_test_service().await;
        let a = service.create(named("A")).await.unwrap();
        service.create(named("B")).await.unwrap();

        assert!(matches!(
            service.update(a.id, named("b")).await,
            Err(CategoryServiceError::Duplicate(_))
        ));
        assert!(service.update(a.id, named("a")).await.is_ok());
        assert!(matches!(
            service
                .update(
                    a.id,
                    CategoryInput {
                        sort_order: Some(-1),
                        ..Default::default()
                    }
                )
                .await,
            Err(CategoryServiceError::ValidationError(_))
        ));
    }
}
