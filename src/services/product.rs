//! Product service
//!
//! Catalogue reads for shoppers and admin maintenance. Every product leaving
//! this service is a [`ProductView`] so responses always carry the
//! discounted price.

use crate::cache::{invalidate_responses, Cache};
use crate::db::is_unique_violation;
use crate::db::repositories::{ProductFilter, ProductRepository};
use crate::models::{CreateProductInput, Product, ProductView, UpdateProductInput};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Most images a product may carry
pub const MAX_PRODUCT_IMAGES: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ProductServiceError {
    #[error("Product not found")]
    NotFound,

    #[error("{0}")]
    ValidationError(String),

    #[error("Product with this SKU already exists")]
    DuplicateSku,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ProductService {
    repo: Arc<dyn ProductRepository>,
    cache: Arc<Cache>,
}

impl ProductService {
    pub fn new(repo: Arc<dyn ProductRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// Listed products, newest first
    pub async fn list_active(&self) -> Result<Vec<ProductView>, ProductServiceError> {
        self.list(ProductFilter::Active).await
    }

    /// Every product including unlisted ones
    pub async fn list_all(&self) -> Result<Vec<ProductView>, ProductServiceError> {
        self.list(ProductFilter::All).await
    }

    pub async fn list_by_category(&self, category: &str) -> Result<Vec<ProductView>, ProductServiceError> {
        self.list(ProductFilter::Category(category.trim().to_string())).await
    }

    pub async fn list_by_tag(&self, tag: &str) -> Result<Vec<ProductView>, ProductServiceError> {
        self.list(ProductFilter::Tag(tag.trim().to_string())).await
    }

    pub async fn list_new(&self) -> Result<Vec<ProductView>, ProductServiceError> {
        self.list(ProductFilter::New).await
    }

    /// Name search over listed products. A blank query matches nothing.
    pub async fn search(&self, query: &str) -> Result<Vec<ProductView>, ProductServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.list(ProductFilter::Search(query.to_string())).await
    }

    pub async fn get(&self, id: i64) -> Result<ProductView, ProductServiceError> {
        Ok(self.require(id).await?.into())
    }

    /// Create a product; `sku`, `name`, `price` and `stock` are mandatory
    pub async fn create(&self, input: CreateProductInput) -> Result<ProductView, ProductServiceError> {
        let (Some(sku), Some(name), Some(price), Some(stock)) = (
            non_blank(input.sku),
            non_blank(input.name),
            input.price,
            input.stock,
        ) else {
            return Err(ProductServiceError::ValidationError(
                "SKU, name, price, and stock are required fields".to_string(),
            ));
        };

        if self
            .repo
            .sku_exists(&sku, None)
            .await
            .context("Failed to check SKU")?
        {
            return Err(ProductServiceError::DuplicateSku);
        }

        let now = Utc::now();
        let product = Product {
            id: 0,
            sku,
            name,
            price,
            discount: input.discount.unwrap_or(0.0),
            is_new: input.is_new.unwrap_or(false),
            rating: input.rating.unwrap_or(0.0),
            sale_count: input.sale_count.unwrap_or(0),
            category: input.category,
            tag: input.tag,
            stock,
            image: input.image,
            short_description: input.short_description.unwrap_or_default(),
            full_description: input.full_description.unwrap_or_default(),
            status: input.status.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        validate_product(&product)?;

        let created = match self.repo.create(&product).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => return Err(ProductServiceError::DuplicateSku),
            Err(e) => return Err(e.context("Failed to create product").into()),
        };

        tracing::info!("Created product {} ({})", created.id, created.sku);
        invalidate_responses(&self.cache, "products").await;
        Ok(created.into())
    }

    /// Apply a partial update. Changing the SKU to one held by another product fails.
    pub async fn update(&self, id: i64, input: UpdateProductInput) -> Result<ProductView, ProductServiceError> {
        let mut product = self.require(id).await?;

        if let Some(sku) = input.sku {
            let sku = sku.trim().to_string();
            if sku.is_empty() {
                return Err(ProductServiceError::ValidationError("SKU cannot be empty".to_string()));
            }
            if !sku.eq_ignore_ascii_case(&product.sku)
                && self
                    .repo
                    .sku_exists(&sku, Some(id))
                    .await
                    .context("Failed to check SKU")?
            {
                return Err(ProductServiceError::DuplicateSku);
            }
            product.sku = sku;
        }
        if let Some(name) = input.name {
            product.name = name.trim().to_string();
        }
        if let Some(price) = input.price {
            product.price = price;
        }
        if let Some(discount) = input.discount {
            product.discount = discount;
        }
        if let Some(is_new) = input.is_new {
            product.is_new = is_new;
        }
        if let Some(rating) = input.rating {
            product.rating = rating;
        }
        if let Some(sale_count) = input.sale_count {
            product.sale_count = sale_count;
        }
        if let Some(category) = input.category {
            product.category = category;
        }
        if let Some(tag) = input.tag {
            product.tag = tag;
        }
        if let Some(stock) = input.stock {
            product.stock = stock;
        }
        if let Some(image) = input.image {
            product.image = image;
        }
        if let Some(short_description) = input.short_description {
            product.short_description = short_description;
        }
        if let Some(full_description) = input.full_description {
            product.full_description = full_description;
        }
        if let Some(status) = input.status {
            product.status = status;
        }
        validate_product(&product)?;

        let updated = match self.repo.update(&product).await {
            Ok(updated) => updated,
            Err(e) if is_unique_violation(&e) => return Err(ProductServiceError::DuplicateSku),
            Err(e) => return Err(e.context("Failed to update product").into()),
        };

        invalidate_responses(&self.cache, "products").await;
        Ok(updated.into())
    }

    /// Permanently remove a product
    pub async fn delete(&self, id: i64) -> Result<(), ProductServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete product")?;
        if !deleted {
            return Err(ProductServiceError::NotFound);
        }
        invalidate_responses(&self.cache, "products").await;
        Ok(())
    }

    async fn list(&self, filter: ProductFilter) -> Result<Vec<ProductView>, ProductServiceError> {
        let products = self
            .repo
            .list(&filter)
            .await
            .context("Failed to list products")?;
        Ok(products.into_iter().map(ProductView::from).collect())
    }

    async fn require(&self, id: i64) -> Result<Product, ProductServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get product")?
            .ok_or(ProductServiceError::NotFound)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn validate_product(product: &Product) -> Result<(), ProductServiceError> {
    let invalid = |msg: &str| Err(ProductServiceError::ValidationError(msg.to_string()));

    if product.name.is_empty() {
        return invalid("Name cannot be empty");
    }
    if !product.price.is_finite() || product.price < 0.0 {
        return invalid("Price must be a non-negative number");
    }
    if !(0.0..=100.0).contains(&product.discount) {
        return invalid("Discount must be between 0 and 100");
    }
    if !(0.0..=5.0).contains(&product.rating) {
        return invalid("Rating must be between 0 and 5");
    }
    if product.stock < 0 {
        return invalid("Stock cannot be negative");
    }
    if product.sale_count < 0 {
        return invalid("Sale count cannot be negative");
    }
    if product.image.len() > MAX_PRODUCT_IMAGES {
        return invalid("Too many files. Maximum 10 images allowed.");
    }
    if product
        .image
        .iter()
        .any(|img| img.starts_with("data:") && !img.starts_with("data:image/"))
    {
        return invalid("Only image files are allowed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxProductRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> ProductService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let cache = Arc::new(Cache::Memory(MemoryCache::new()));
        ProductService::new(SqlxProductRepository::boxed(pool), cache)
    }

    fn input(sku: &str, price: f64, stock: i64) -> CreateProductInput {
        CreateProductInput {
            sku: Some(sku.to_string()),
            name: Some(format!("Product {}", sku)),
            price: Some(price),
            stock: Some(stock),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults_and_discount() {
        let service = setup_test_service().await;
        let mut create = input("SKU-1", 100.0, 5);
        create.discount = Some(15.0);

        let view = service.create(create).await.unwrap();
        assert_eq!(view.discounted_price, 85.0);
        assert!(view.product.status);
        assert_eq!(view.product.rating, 0.0);
    }

    #[tokio::test]
    async fn test_create_requires_core_fields() {
        let service = setup_test_service().await;
        let mut create = input("SKU-1", 10.0, 1);
        create.stock = None;

        let err = service.create(create).await.unwrap_err();
        assert_eq!(err.to_string(), "SKU, name, price, and stock are required fields");
    }

    #[tokio::test]
    async fn test_create_rejects_out_of_range_values() {
        let service = setup_test_service().await;

        let mut bad_discount = input("A", 10.0, 1);
        bad_discount.discount = Some(120.0);
        assert!(matches!(
            service.create(bad_discount).await,
            Err(ProductServiceError::ValidationError(_))
        ));

        assert!(matches!(
            service.create(input("B", -1.0, 1)).await,
            Err(ProductServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(input("C", 1.0, -1)).await,
            Err(ProductServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_sku_ignores_case() {
        let service = setup_test_service().await;
        service.create(input("sku-1", 10.0, 1)).await.unwrap();

        assert!(matches!(
            service.create(input("SKU-1", 10.0, 1)).await,
            Err(ProductServiceError::DuplicateSku)
        ));
    }

    #[tokio::test]
    async fn test_update_sku_conflict_excludes_self() {
        let service = setup_test_service().await;
        let a = service.create(input("A", 10.0, 1)).await.unwrap();
        service.create(input("B", 10.0, 1)).await.unwrap();

        let same = service
            .update(
                a.product.id,
                UpdateProductInput {
                    sku: Some("a".into()),
                    price: Some(20.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.product.price, 20.0);

        let clash = service
            .update(
                a.product.id,
                UpdateProductInput {
                    sku: Some("B".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(clash, Err(ProductServiceError::DuplicateSku)));
    }

    #[tokio::test]
    async fn test_listings_hide_unlisted_products() {
        let service = setup_test_service().await;
        let mut hidden = input("H", 10.0, 1);
        hidden.status = Some(false);
        hidden.category = vec!["Shoes".into()];
        service.create(hidden).await.unwrap();

        let mut shown = input("S", 10.0, 1);
        shown.category = vec!["Shoes".into()];
        shown.is_new = Some(true);
        service.create(shown).await.unwrap();

        assert_eq!(service.list_all().await.unwrap().len(), 2);
        assert_eq!(service.list_active().await.unwrap().len(), 1);
        assert_eq!(service.list_by_category("shoes").await.unwrap().len(), 1);
        assert_eq!(service.list_new().await.unwrap().len(), 1);
        assert_eq!(service.search("product s").await.unwrap().len(), 1);
        assert!(service.search("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let service = setup_test_service().await;
        let view = service.create(input("X", 1.0, 1)).await.unwrap();

        service.delete(view.product.id).await.unwrap();
        assert!(matches!(service.get(view.product.id).await, Err(ProductServiceError::NotFound)));
        assert!(matches!(service.delete(view.product.id).await, Err(ProductServiceError::NotFound)));
    }
}
