//! Banner and hero slider repositories
//!
//! Both are flat promotional records ordered by `sort_order`. Banner ids
//! are assigned by the caller from the `bannerId` counter; hero slider ids
//! are plain row ids.

use crate::db::DynDatabasePool;
use crate::models::{Banner, HeroSlider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait BannerRepository: Send + Sync {
    /// Insert a banner with its pre-assigned id
    async fn create(&self, banner: &Banner) -> Result<Banner>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Banner>>;

    /// Banners by sort order; only active ones when `active_only`
    async fn list(&self, active_only: bool) -> Result<Vec<Banner>>;

    async fn update(&self, banner: &Banner) -> Result<Banner>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait HeroSliderRepository: Send + Sync {
    async fn create(&self, slider: &HeroSlider) -> Result<HeroSlider>;

    async fn get_by_id(&self, id: i64) -> Result<Option<HeroSlider>>;

    async fn list(&self, active_only: bool) -> Result<Vec<HeroSlider>>;

    async fn update(&self, slider: &HeroSlider) -> Result<HeroSlider>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxBannerRepository {
    pool: DynDatabasePool,
}

impl SqlxBannerRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BannerRepository> {
        Arc::new(Self::new(pool))
    }
}

pub struct SqlxHeroSliderRepository {
    pool: DynDatabasePool,
}

impl SqlxHeroSliderRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn HeroSliderRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Column set shared by `banners` and `hero_sliders`
struct PromoRow {
    id: i64,
    background_image: String,
    category: String,
    discount: f64,
    sort_order: i64,
    is_active: bool,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl From<&sqlx::sqlite::SqliteRow> for PromoRow {
    fn from(row: &sqlx::sqlite::SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            background_image: row.get("background_image"),
            category: row.get("category"),
            discount: row.get("discount"),
            sort_order: row.get("sort_order"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

impl From<PromoRow> for Banner {
    fn from(r: PromoRow) -> Self {
        Banner {
            id: r.id,
            background_image: r.background_image,
            category: r.category,
            discount: r.discount,
            sort_order: r.sort_order,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl From<PromoRow> for HeroSlider {
    fn from(r: PromoRow) -> Self {
        HeroSlider {
            id: r.id,
            background_image: r.background_image,
            category: r.category,
            discount: r.discount,
            sort_order: r.sort_order,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl From<Banner> for PromoRow {
    fn from(b: Banner) -> Self {
        Self {
            id: b.id,
            background_image: b.background_image,
            category: b.category,
            discount: b.discount,
            sort_order: b.sort_order,
            is_active: b.is_active,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

impl From<HeroSlider> for PromoRow {
    fn from(h: HeroSlider) -> Self {
        Self {
            id: h.id,
            background_image: h.background_image,
            category: h.category,
            discount: h.discount,
            sort_order: h.sort_order,
            is_active: h.is_active,
            created_at: h.created_at,
            updated_at: h.updated_at,
        }
    }
}

async fn fetch_one_promo(pool: &SqlitePool, table: &str, id: i64) -> Result<Option<PromoRow>> {
    let sql = format!("SELECT * FROM {} WHERE id = ?", table);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get {} row", table))?;
    Ok(row.as_ref().map(PromoRow::from))
}

async fn fetch_promos(pool: &SqlitePool, table: &str, active_only: bool) -> Result<Vec<PromoRow>> {
    let filter = if active_only { "WHERE is_active = 1" } else { "" };
    let sql = format!("SELECT * FROM {} {} ORDER BY sort_order ASC, id ASC", table, filter);
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to list {}", table))?;
    Ok(rows.iter().map(PromoRow::from).collect())
}

async fn update_promo(pool: &SqlitePool, table: &str, promo: PromoRow) -> Result<PromoRow> {
    let sql = format!(
        "UPDATE {} SET background_image = ?, category = ?, discount = ?, sort_order = ?, is_active = ?, \
         updated_at = ? WHERE id = ?",
        table
    );
    sqlx::query(&sql)
        .bind(&promo.background_image)
        .bind(&promo.category)
        .bind(promo.discount)
        .bind(promo.sort_order)
        .bind(promo.is_active)
        .bind(Utc::now())
        .bind(promo.id)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to update {} row", table))?;

    fetch_one_promo(pool, table, promo.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("{} row {} not found after update", table, promo.id))
}

async fn delete_promo(pool: &SqlitePool, table: &str, id: i64) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?", table);
    let result = sqlx::query(&sql)
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to delete {} row", table))?;
    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl BannerRepository for SqlxBannerRepository {
    async fn create(&self, banner: &Banner) -> Result<Banner> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO banners (id, background_image, category, discount, sort_order, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(banner.id)
        .bind(&banner.background_image)
        .bind(&banner.category)
        .bind(banner.discount)
        .bind(banner.sort_order)
        .bind(banner.is_active)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create banner")?;

        Ok(Banner {
            created_at: now,
            updated_at: now,
            ..banner.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Banner>> {
        Ok(fetch_one_promo(self.pool.sqlite(), "banners", id).await?.map(Banner::from))
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Banner>> {
        let rows = fetch_promos(self.pool.sqlite(), "banners", active_only).await?;
        Ok(rows.into_iter().map(Banner::from).collect())
    }

    async fn update(&self, banner: &Banner) -> Result<Banner> {
        update_promo(self.pool.sqlite(), "banners", PromoRow::from(banner.clone()))
            .await
            .map(Banner::from)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        delete_promo(self.pool.sqlite(), "banners", id).await
    }
}

#[async_trait]
impl HeroSliderRepository for SqlxHeroSliderRepository {
    async fn create(&self, slider: &HeroSlider) -> Result<HeroSlider> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO hero_sliders (background_image, category, discount, sort_order, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&slider.background_image)
        .bind(&slider.category)
        .bind(slider.discount)
        .bind(slider.sort_order)
        .bind(slider.is_active)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create hero slider")?;

        Ok(HeroSlider {
            id: result.last_insert_rowid(),
            created_at: now,
            updated_at: now,
            ..slider.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<HeroSlider>> {
        Ok(fetch_one_promo(self.pool.sqlite(), "hero_sliders", id)
            .await?
            .map(HeroSlider::from))
    }

    async fn list(&self, active_only: bool) -> Result<Vec<HeroSlider>> {
        let rows = fetch_promos(self.pool.sqlite(), "hero_sliders", active_only).await?;
        Ok(rows.into_iter().map(HeroSlider::from).collect())
    }

    async fn update(&self, slider: &HeroSlider) -> Result<HeroSlider> {
        update_promo(self.pool.sqlite(), "hero_sliders", PromoRow::from(slider.clone()))
            .await
            .map(HeroSlider::from)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        delete_promo(self.pool.sqlite(), "hero_sliders", id).await
    }
}
