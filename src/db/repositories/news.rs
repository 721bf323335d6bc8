//! News repository
//!
//! All five news kinds live in the `news` table, told apart by `kind`.
//! Thumbnail bytes sit on the row and gallery images in `news_images`;
//! listings only load image metadata.

use crate::db::DynDatabasePool;
use crate::models::{ImageMeta, News, NewsBreakdown, NewsKind, StoredImage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::sync::Arc;

/// Which articles of a kind a listing returns
#[derive(Debug, Clone, PartialEq)]
pub enum NewsFilter {
    /// Active articles, newest first
    Active,
    /// Soft-deleted articles, most recently updated first
    Deleted,
    /// Active articles of a category (any case), newest first
    Category(String),
}

#[async_trait]
pub trait NewsRepository: Send + Sync {
    async fn create(&self, news: &News, thumb: Option<&StoredImage>, images: &[StoredImage]) -> Result<News>;

    /// Get by id regardless of `is_active`
    async fn get_by_id(&self, kind: NewsKind, id: i64) -> Result<Option<News>>;

    async fn get_active_by_slug(&self, kind: NewsKind, slug: &str) -> Result<Option<News>>;

    /// Whether another article of the kind uses the slug
    async fn slug_exists(&self, kind: NewsKind, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    async fn list(&self, kind: NewsKind, filter: &NewsFilter) -> Result<Vec<News>>;

    /// Persist text fields and `is_active`; replace the thumb and gallery when given
    async fn update(&self, news: &News, thumb: Option<&StoredImage>, images: Option<&[StoredImage]>) -> Result<News>;

    /// Toggle `is_active`, returning false when the article does not exist
    async fn set_active(&self, kind: NewsKind, id: i64, is_active: bool) -> Result<bool>;

    /// Remove the article and its images permanently
    async fn delete(&self, kind: NewsKind, id: i64) -> Result<bool>;

    async fn thumb(&self, kind: NewsKind, id: i64) -> Result<Option<StoredImage>>;

    /// Gallery image at `index` (0-based)
    async fn image(&self, kind: NewsKind, id: i64, index: i64) -> Result<Option<StoredImage>>;

    /// Active articles of every kind, newest first
    async fn list_all_active(&self, offset: i64, limit: i64) -> Result<Vec<News>>;

    /// Number of active articles per kind
    async fn count_active_by_kind(&self) -> Result<NewsBreakdown>;
}

pub struct SqlxNewsRepository {
    pool: DynDatabasePool,
}

impl SqlxNewsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NewsRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Everything but the thumbnail bytes, plus gallery metadata as JSON
const NEWS_COLUMNS: &str = r#"
    id, kind, slug, title, excerpt, date, time, paragraphs, video_url, page, category, tag,
    thumb_mime, thumb_name, thumb_size, is_active, created_at, updated_at,
    (SELECT json_group_array(json_object('originalName', original_name, 'mimetype', mime_type, 'size', size))
       FROM (SELECT original_name, mime_type, size FROM news_images
             WHERE news_images.news_id = news.id ORDER BY position)) AS images_json
"#;

#[async_trait]
impl NewsRepository for SqlxNewsRepository {
    async fn create(&self, news: &News, thumb: Option<&StoredImage>, images: &[StoredImage]) -> Result<News> {
        let id = create_news_tx(self.pool.sqlite(), news, thumb, images).await?;
        get_news_by_id(self.pool.sqlite(), news.kind, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("News not found after create"))
    }

    async fn get_by_id(&self, kind: NewsKind, id: i64) -> Result<Option<News>> {
        get_news_by_id(self.pool.sqlite(), kind, id).await
    }

    async fn get_active_by_slug(&self, kind: NewsKind, slug: &str) -> Result<Option<News>> {
        let sql = format!(
            "SELECT {} FROM news WHERE kind = ? AND slug = ? AND is_active = 1",
            NEWS_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(kind.as_str())
            .bind(slug.trim())
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get news by slug")?;
        row.as_ref().map(row_to_news).transpose()
    }

    async fn slug_exists(&self, kind: NewsKind, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM news WHERE kind = ? AND slug = ? AND id != ?")
            .bind(kind.as_str())
            .bind(slug.trim())
            .bind(exclude_id.unwrap_or(0))
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to check news slug")?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn list(&self, kind: NewsKind, filter: &NewsFilter) -> Result<Vec<News>> {
        list_news(self.pool.sqlite(), kind, filter).await
    }

    async fn update(&self, news: &News, thumb: Option<&StoredImage>, images: Option<&[StoredImage]>) -> Result<News> {
        update_news_tx(self.pool.sqlite(), news, thumb, images).await?;
        get_news_by_id(self.pool.sqlite(), news.kind, news.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("News not found after update"))
    }

    async fn set_active(&self, kind: NewsKind, id: i64, is_active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE news SET is_active = ?, updated_at = ? WHERE kind = ? AND id = ?")
            .bind(is_active)
            .bind(Utc::now())
            .bind(kind.as_str())
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to change news status")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, kind: NewsKind, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM news WHERE kind = ? AND id = ?")
            .bind(kind.as_str())
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete news")?;
        Ok(result.rows_affected() > 0)
    }

    async fn thumb(&self, kind: NewsKind, id: i64) -> Result<Option<StoredImage>> {
        let row = sqlx::query(
            r#"
            SELECT thumb_data, thumb_mime, thumb_name
            FROM news
            WHERE kind = ? AND id = ? AND thumb_data IS NOT NULL
            "#,
        )
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to load news thumbnail")?;

        Ok(row.map(|row| StoredImage {
            data: row.get("thumb_data"),
            mime_type: row.get::<Option<String>, _>("thumb_mime").unwrap_or_default(),
            original_name: row.get::<Option<String>, _>("thumb_name").unwrap_or_default(),
        }))
    }

    async fn image(&self, kind: NewsKind, id: i64, index: i64) -> Result<Option<StoredImage>> {
        let row = sqlx::query(
            r#"
            SELECT i.data, i.mime_type, i.original_name
            FROM news_images i
            JOIN news n ON n.id = i.news_id
            WHERE n.kind = ? AND n.id = ?
            ORDER BY i.position
            LIMIT 1 OFFSET ?
            "#,
        )
        .bind(kind.as_str())
        .bind(id)
        .bind(index)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to load news image")?;

        Ok(row.map(|row| StoredImage {
            data: row.get("data"),
            mime_type: row.get("mime_type"),
            original_name: row.get("original_name"),
        }))
    }

    async fn list_all_active(&self, offset: i64, limit: i64) -> Result<Vec<News>> {
        let sql = format!(
            "SELECT {} FROM news WHERE is_active = 1 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            NEWS_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list combined news")?;
        rows.iter().map(row_to_news).collect()
    }

    async fn count_active_by_kind(&self) -> Result<NewsBreakdown> {
        let rows = sqlx::query("SELECT kind, COUNT(*) as count FROM news WHERE is_active = 1 GROUP BY kind")
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to count news by kind")?;

        let mut breakdown = NewsBreakdown::default();
        for row in rows {
            let kind: String = row.get("kind");
            match NewsKind::from_str(&kind) {
                Ok(kind) => breakdown.set(kind, row.get("count")),
                Err(_) => tracing::warn!("Ignoring news rows with unknown kind {:?}", kind),
            }
        }
        Ok(breakdown)
    }
}

async fn get_news_by_id(pool: &SqlitePool, kind: NewsKind, id: i64) -> Result<Option<News>> {
    let sql = format!("SELECT {} FROM news WHERE kind = ? AND id = ?", NEWS_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get news by ID")?;
    row.as_ref().map(row_to_news).transpose()
}

async fn list_news(pool: &SqlitePool, kind: NewsKind, filter: &NewsFilter) -> Result<Vec<News>> {
    let (condition, order, category) = match filter {
        NewsFilter::Active => ("is_active = 1", "created_at DESC, id DESC", None),
        NewsFilter::Deleted => ("is_active = 0", "updated_at DESC, id DESC", None),
        NewsFilter::Category(category) => (
            "is_active = 1 AND lower(category) = lower(?)",
            "created_at DESC, id DESC",
            Some(category.trim().to_string()),
        ),
    };

    let sql = format!(
        "SELECT {} FROM news WHERE kind = ? AND {} ORDER BY {}",
        NEWS_COLUMNS, condition, order
    );
    let mut query = sqlx::query(&sql).bind(kind.as_str());
    if let Some(category) = category {
        query = query.bind(category);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to list {} news ({:?})", kind, filter))?;
    rows.iter().map(row_to_news).collect()
}

async fn create_news_tx(
    pool: &SqlitePool,
    news: &News,
    thumb: Option<&StoredImage>,
    images: &[StoredImage],
) -> Result<i64> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin news transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO news (kind, slug, title, excerpt, date, time, paragraphs, video_url, page, category, tag,
                          thumb_data, thumb_mime, thumb_name, thumb_size, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(news.kind.as_str())
    .bind(&news.slug)
    .bind(&news.title)
    .bind(&news.excerpt)
    .bind(&news.date)
    .bind(&news.time)
    .bind(serde_json::to_string(&news.paragraphs)?)
    .bind(&news.video_url)
    .bind(&news.page)
    .bind(&news.category)
    .bind(&news.tag)
    .bind(thumb.map(|t| t.data.clone()))
    .bind(thumb.map(|t| t.mime_type.clone()))
    .bind(thumb.map(|t| t.original_name.clone()))
    .bind(thumb.map(|t| t.size()))
    .bind(news.is_active)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create news")?;

    let id = result.last_insert_rowid();
    insert_images(&mut tx, id, images).await?;

    tx.commit().await.context("Failed to commit news transaction")?;
    Ok(id)
}

async fn update_news_tx(
    pool: &SqlitePool,
    news: &News,
    thumb: Option<&StoredImage>,
    images: Option<&[StoredImage]>,
) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin news transaction")?;

    sqlx::query(
        r#"
        UPDATE news
        SET slug = ?, title = ?, excerpt = ?, date = ?, time = ?, paragraphs = ?, video_url = ?,
            page = ?, category = ?, tag = ?, is_active = ?, updated_at = ?
        WHERE kind = ? AND id = ?
        "#,
    )
    .bind(&news.slug)
    .bind(&news.title)
    .bind(&news.excerpt)
    .bind(&news.date)
    .bind(&news.time)
    .bind(serde_json::to_string(&news.paragraphs)?)
    .bind(&news.video_url)
    .bind(&news.page)
    .bind(&news.category)
    .bind(&news.tag)
    .bind(news.is_active)
    .bind(Utc::now())
    .bind(news.kind.as_str())
    .bind(news.id)
    .execute(&mut *tx)
    .await
    .context("Failed to update news")?;

    if let Some(thumb) = thumb {
        sqlx::query("UPDATE news SET thumb_data = ?, thumb_mime = ?, thumb_name = ?, thumb_size = ? WHERE id = ?")
            .bind(&thumb.data)
            .bind(&thumb.mime_type)
            .bind(&thumb.original_name)
            .bind(thumb.size())
            .bind(news.id)
            .execute(&mut *tx)
            .await
            .context("Failed to replace news thumbnail")?;
    }

    if let Some(images) = images {
        sqlx::query("DELETE FROM news_images WHERE news_id = ?")
            .bind(news.id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear news images")?;
        insert_images(&mut tx, news.id, images).await?;
    }

    tx.commit().await.context("Failed to commit news transaction")?;
    Ok(())
}

async fn insert_images(tx: &mut Transaction<'_, Sqlite>, news_id: i64, images: &[StoredImage]) -> Result<()> {
    for (position, image) in images.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO news_images (news_id, position, data, mime_type, original_name, size)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(news_id)
        .bind(position as i64)
        .bind(&image.data)
        .bind(&image.mime_type)
        .bind(&image.original_name)
        .bind(image.size())
        .execute(&mut **tx)
        .await
        .context("Failed to store news image")?;
    }
    Ok(())
}

fn row_to_news(row: &sqlx::sqlite::SqliteRow) -> Result<News> {
    let kind_str: String = row.get("kind");
    let kind = NewsKind::from_str(&kind_str).map_err(anyhow::Error::msg)?;

    let paragraphs: String = row.get("paragraphs");
    let paragraphs: Vec<String> =
        serde_json::from_str(&paragraphs).context("Invalid JSON in news.paragraphs")?;

    let thumb = match row.get::<Option<String>, _>("thumb_mime") {
        Some(mimetype) => Some(ImageMeta {
            original_name: row.get::<Option<String>, _>("thumb_name").unwrap_or_default(),
            mimetype,
            size: row.get::<Option<i64>, _>("thumb_size").unwrap_or_default(),
        }),
        None => None,
    };

    let images = if kind.has_gallery() {
        let raw: Option<String> = row.get("images_json");
        let images: Vec<ImageMeta> = match raw {
            Some(raw) => serde_json::from_str(&raw).context("Invalid news image metadata")?,
            None => Vec::new(),
        };
        Some(images)
    } else {
        None
    };

    Ok(News {
        id: row.get("id"),
        kind,
        slug: row.get("slug"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        date: row.get("date"),
        time: row.get("time"),
        paragraphs,
        video_url: row.get("video_url"),
        page: row.get("page"),
        category: row.get("category"),
        tag: row.get("tag"),
        thumb,
        images,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
