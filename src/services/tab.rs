//! Storefront tab service

use crate::cache::{invalidate_responses, Cache};
use crate::db::is_unique_violation;
use crate::db::repositories::TabRepository;
use crate::models::{Tab, TabInput};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum TabServiceError {
    #[error("Tab not found")]
    NotFound,

    #[error("{0}")]
    ValidationError(String),

    #[error("Tab with this name already exists")]
    DuplicateName,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct TabService {
    repo: Arc<dyn TabRepository>,
    cache: Arc<Cache>,
}

impl TabService {
    pub fn new(repo: Arc<dyn TabRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// Tabs by sort order, optionally only the enabled ones
    pub async fn list(&self, active_only: bool) -> Result<Vec<Tab>, TabServiceError> {
        let tabs = self.repo.list(active_only).await.context("Failed to list tabs")?;
        Ok(tabs)
    }

    pub async fn get(&self, id: i64) -> Result<Tab, TabServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tab")?
            .ok_or(TabServiceError::NotFound)
    }

    pub async fn create(&self, input: TabInput) -> Result<Tab, TabServiceError> {
        let name = required_name(input.name)?;
        let sort_order = validated_sort_order(input.sort_order)?.unwrap_or(0);
        self.ensure_name_free(&name, None).await?;

        let now = Utc::now();
        let tab = Tab {
            id: 0,
            name,
            status: input.status.unwrap_or(true),
            sort_order,
            created_at: now,
            updated_at: now,
        };

        let created = match self.repo.create(&tab).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => return Err(TabServiceError::DuplicateName),
            Err(e) => return Err(e.context("Failed to create tab").into()),
        };
        invalidate_responses(&self.cache, "tabs").await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: TabInput) -> Result<Tab, TabServiceError> {
        let mut tab = self.get(id).await?;

        if let Some(name) = input.name {
            let name = required_name(Some(name))?;
            self.ensure_name_free(&name, Some(id)).await?;
            tab.name = name;
        }
        if let Some(status) = input.status {
            tab.status = status;
        }
        if let Some(sort_order) = validated_sort_order(input.sort_order)? {
            tab.sort_order = sort_order;
        }

        let updated = match self.repo.update(&tab).await {
            Ok(updated) => updated,
            Err(e) if is_unique_violation(&e) => return Err(TabServiceError::DuplicateName),
            Err(e) => return Err(e.context("Failed to update tab").into()),
        };
        invalidate_responses(&self.cache, "tabs").await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), TabServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete tab")? {
            return Err(TabServiceError::NotFound);
        }
        invalidate_responses(&self.cache, "tabs").await;
        Ok(())
    }

    async fn ensure_name_free(&self, name: &str, exclude_id: Option<i64>) -> Result<(), TabServiceError> {
        if self
            .repo
            .exists_by_name(name, exclude_id)
            .await
            .context("Failed to check tab name")?
        {
            return Err(TabServiceError::DuplicateName);
        }
        Ok(())
    }
}

fn required_name(name: Option<String>) -> Result<String, TabServiceError> {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| TabServiceError::ValidationError("Name is required".to_string()))
}

fn validated_sort_order(sort_order: Option<i64>) -> Result<Option<i64>, TabServiceError> {
    match sort_order {
        Some(n) if n < 0 => Err(TabServiceError::ValidationError(
            "Sort order cannot be negative".to_string(),
        )),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxTabRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> TabService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        TabService::new(
            SqlxTabRepository::boxed(pool),
            Arc::new(Cache::Memory(MemoryCache::new())),
        )
    }

    fn named(name: &str, sort_order: i64) -> TabInput {
        TabInput {
            name: Some(name.into()),
            status: None,
            sort_order: Some(sort_order),
        }
    }

    #[tokio::test]
    async fn test_tab_lifecycle() {
        let service = setup().await;
        let deals = service.create(named("Deals", 2)).await.unwrap();
        service.create(named("New In", 1)).await.unwrap();

        let names: Vec<String> = service.list(true).await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["New In", "Deals"]);

        service
            .update(
                deals.id,
                TabInput {
                    status: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(service.list(true).await.unwrap().len(), 1);
        assert_eq!(service.list(false).await.unwrap().len(), 2);

        service.delete(deals.id).await.unwrap();
        assert!(matches!(service.get(deals.id).await, Err(TabServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_duplicate_name_ignores_case() {
        let service = setup().await;
        let a = service.create(named("Deals", 0)).await.unwrap();
        assert!(matches!(
            service.create(named("DEALS", 0)).await,
            Err(TabServiceError::DuplicateName)
        ));
        assert!(service.update(a.id, named("deals", 0)).await.is_ok());
        assert!(matches!(
            service.create(TabInput::default()).await,
            Err(TabServiceError::ValidationError(_))
        ));
    }
}
