//! News service
//!
//! One service drives all five news kinds; the kind is passed on every
//! call. Images arrive as base64 `data:` URLs and are decoded here before
//! they reach the repository.

use crate::cache::{invalidate_responses, Cache};
use crate::db::is_unique_violation;
use crate::db::repositories::{NewsFilter, NewsRepository};
use crate::models::{
    CombinedNewsPage, CreateNewsInput, ImageUpload, News, NewsKind, StoredImage, UpdateNewsInput,
};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Largest accepted image, per file
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Largest accepted gallery
pub const MAX_GALLERY_IMAGES: usize = 10;

pub const DEFAULT_PAGE_LIMIT: i64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum NewsServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("{} with this slug already exists", .0.label())]
    DuplicateSlug(NewsKind),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct NewsService {
    repo: Arc<dyn NewsRepository>,
    cache: Arc<Cache>,
}

impl NewsService {
    pub fn new(repo: Arc<dyn NewsRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// Active articles, newest first
    pub async fn list_active(&self, kind: NewsKind) -> Result<Vec<News>, NewsServiceError> {
        let list = self
            .repo
            .list(kind, &NewsFilter::Active)
            .await
            .with_context(|| format!("Failed to list {} news", kind))?;
        Ok(list)
    }

    /// Soft-deleted articles, most recently updated first
    pub async fn list_deleted(&self, kind: NewsKind) -> Result<Vec<News>, NewsServiceError> {
        let list = self
            .repo
            .list(kind, &NewsFilter::Deleted)
            .await
            .with_context(|| format!("Failed to list deleted {} news", kind))?;
        Ok(list)
    }

    pub async fn list_by_category(&self, kind: NewsKind, category: &str) -> Result<Vec<News>, NewsServiceError> {
        if !kind.supports_category_listing() {
            return Err(NewsServiceError::ValidationError(format!(
                "{} does not support category listing",
                kind.label()
            )));
        }
        let list = self
            .repo
            .list(kind, &NewsFilter::Category(category.trim().to_string()))
            .await
            .with_context(|| format!("Failed to list {} news by category", kind))?;
        Ok(list)
    }

    pub async fn get_active_by_slug(&self, kind: NewsKind, slug: &str) -> Result<News, NewsServiceError> {
        self.repo
            .get_active_by_slug(kind, slug)
            .await
            .context("Failed to get news by slug")?
            .ok_or_else(|| not_found(kind))
    }

    pub async fn get(&self, kind: NewsKind, id: i64) -> Result<News, NewsServiceError> {
        self.repo
            .get_by_id(kind, id)
            .await
            .context("Failed to get news")?
            .ok_or_else(|| not_found(kind))
    }

    pub async fn thumb(&self, kind: NewsKind, id: i64) -> Result<StoredImage, NewsServiceError> {
        self.get(kind, id).await?;
        self.repo
            .thumb(kind, id)
            .await
            .context("Failed to load thumbnail")?
            .ok_or_else(|| NewsServiceError::NotFound("Thumbnail not found".to_string()))
    }

    /// Gallery image at `index` (0-based)
    pub async fn image(&self, kind: NewsKind, id: i64, index: i64) -> Result<StoredImage, NewsServiceError> {
        self.get(kind, id).await?;
        if !kind.has_gallery() || index < 0 {
            return Err(NewsServiceError::NotFound("Image not found".to_string()));
        }
        self.repo
            .image(kind, id, index)
            .await
            .context("Failed to load gallery image")?
            .ok_or_else(|| NewsServiceError::NotFound("Image not found".to_string()))
    }

    pub async fn create(&self, kind: NewsKind, input: CreateNewsInput) -> Result<News, NewsServiceError> {
        let mut missing = Vec::new();
        let mut take = |value: Option<String>, field: &'static str| {
            let value = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
            if value.is_none() {
                missing.push(field);
            }
            value.unwrap_or_default()
        };

        let slug = take(input.slug, "slug");
        let title = take(input.title, "title");
        let excerpt = take(input.excerpt, "excerpt");
        let date = take(input.date, "date");
        let time = take(input.time, "time");
        let (page, category, tag) = if kind.requires_taxonomy() {
            (
                Some(take(input.page, "page")),
                Some(take(input.category, "category")),
                Some(take(input.tag, "tag")),
            )
        } else {
            (None, None, None)
        };
        if !missing.is_empty() {
            return Err(NewsServiceError::ValidationError(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let thumb = input
            .thumb
            .as_ref()
            .map(|upload| decode_image(upload, "thumb"))
            .transpose()?;
        let images = self.decode_gallery(kind, &input.images)?;

        if self
            .repo
            .slug_exists(kind, &slug, None)
            .await
            .context("Failed to check news slug")?
        {
            return Err(NewsServiceError::DuplicateSlug(kind));
        }

        let now = Utc::now();
        let news = News {
            id: 0,
            kind,
            slug,
            title,
            excerpt,
            date,
            time,
            paragraphs: clean_paragraphs(input.paragraphs),
            video_url: non_blank(input.video_url),
            page,
            category,
            tag,
            thumb: None,
            images: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let created = match self.repo.create(&news, thumb.as_ref(), &images).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => return Err(NewsServiceError::DuplicateSlug(kind)),
            Err(e) => return Err(e.context("Failed to create news").into()),
        };

        tracing::info!("Created {} news {} ({})", kind, created.id, created.slug);
        self.invalidate(kind).await;
        Ok(created)
    }

    pub async fn update(&self, kind: NewsKind, id: i64, input: UpdateNewsInput) -> Result<News, NewsServiceError> {
        if input.is_empty() {
            return Err(NewsServiceError::ValidationError(
                "No valid fields provided for update".to_string(),
            ));
        }
        let mut news = self.get(kind, id).await?;

        if let Some(slug) = input.slug {
            let slug = required(slug, "slug")?;
            if self
                .repo
                .slug_exists(kind, &slug, Some(id))
                .await
                .context("Failed to check news slug")?
            {
                return Err(NewsServiceError::DuplicateSlug(kind));
            }
            news.slug = slug;
        }
        if let Some(title) = input.title {
            news.title = required(title, "title")?;
        }
        if let Some(excerpt) = input.excerpt {
            news.excerpt = required(excerpt, "excerpt")?;
        }
        if let Some(date) = input.date {
            news.date = required(date, "date")?;
        }
        if let Some(time) = input.time {
            news.time = required(time, "time")?;
        }
        if let Some(paragraphs) = input.paragraphs {
            news.paragraphs = clean_paragraphs(paragraphs);
        }
        if input.video_url.is_some() {
            news.video_url = non_blank(input.video_url);
        }
        if kind.requires_taxonomy() {
            if let Some(page) = input.page {
                news.page = Some(required(page, "page")?);
            }
            if let Some(category) = input.category {
                news.category = Some(required(category, "category")?);
            }
            if let Some(tag) = input.tag {
                news.tag = Some(required(tag, "tag")?);
            }
        }
        if let Some(is_active) = input.is_active {
            news.is_active = is_active;
        }

        let thumb = input
            .thumb
            .as_ref()
            .map(|upload| decode_image(upload, "thumb"))
            .transpose()?;
        let images = input
            .images
            .as_deref()
            .map(|uploads| self.decode_gallery(kind, uploads))
            .transpose()?;

        let updated = match self.repo.update(&news, thumb.as_ref(), images.as_deref()).await {
            Ok(updated) => updated,
            Err(e) if is_unique_violation(&e) => return Err(NewsServiceError::DuplicateSlug(kind)),
            Err(e) => return Err(e.context("Failed to update news").into()),
        };
        self.invalidate(kind).await;
        Ok(updated)
    }

    /// Hide an article from public listings
    pub async fn soft_delete(&self, kind: NewsKind, id: i64) -> Result<(), NewsServiceError> {
        if !self
            .repo
            .set_active(kind, id, false)
            .await
            .context("Failed to soft delete news")?
        {
            return Err(not_found(kind));
        }
        self.invalidate(kind).await;
        Ok(())
    }

    pub async fn hard_delete(&self, kind: NewsKind, id: i64) -> Result<(), NewsServiceError> {
        if !self.repo.delete(kind, id).await.context("Failed to delete news")? {
            return Err(not_found(kind));
        }
        tracing::info!("Permanently deleted {} news {}", kind, id);
        self.invalidate(kind).await;
        Ok(())
    }

    /// One page of active articles across every kind, newest first
    pub async fn combined(&self, page: Option<i64>, limit: Option<i64>) -> Result<CombinedNewsPage, NewsServiceError> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(1);

        let breakdown = self
            .repo
            .count_active_by_kind()
            .await
            .context("Failed to count news")?;
        let data = self
            .repo
            .list_all_active((page - 1).saturating_mul(limit), limit)
            .await
            .context("Failed to list combined news")?;

        let total_count = breakdown.total();
        Ok(CombinedNewsPage {
            success: true,
            total_count,
            page,
            limit,
            total_pages: page_count(total_count, limit),
            data,
            breakdown,
        })
    }

    fn decode_gallery(&self, kind: NewsKind, uploads: &[ImageUpload]) -> Result<Vec<StoredImage>, NewsServiceError> {
        if uploads.is_empty() {
            return Ok(Vec::new());
        }
        if !kind.has_gallery() {
            return Err(NewsServiceError::ValidationError(format!(
                "{} does not have an image gallery",
                kind.label()
            )));
        }
        if uploads.len() > MAX_GALLERY_IMAGES {
            return Err(NewsServiceError::ValidationError(format!(
                "Too many files. Maximum {} images allowed.",
                MAX_GALLERY_IMAGES
            )));
        }
        uploads
            .iter()
            .enumerate()
            .map(|(i, upload)| decode_image(upload, &format!("image-{}", i + 1)))
            .collect()
    }

    async fn invalidate(&self, kind: NewsKind) {
        invalidate_responses(&self.cache, kind.route_prefix()).await;
        invalidate_responses(&self.cache, "combined-news").await;
    }
}

/// Pages needed for `total` items, `limit` per page (`limit >= 1`)
fn page_count(total: i64, limit: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total - 1) / limit + 1
    }
}

/// Decode a `data:<mime>;base64,<payload>` upload
pub fn decode_image(upload: &ImageUpload, fallback_name: &str) -> Result<StoredImage, NewsServiceError> {
    let invalid = || NewsServiceError::ValidationError("Image must be a base64 encoded data URL".to_string());

    let rest = upload.data_url.trim().strip_prefix("data:").ok_or_else(invalid)?;
    let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;
    let mime_type = header.strip_suffix(";base64").ok_or_else(invalid)?.to_ascii_lowercase();
    if !mime_type.starts_with("image/") {
        return Err(NewsServiceError::ValidationError(
            "Only image files are allowed".to_string(),
        ));
    }

    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    // 4 base64 chars encode 3 bytes
    if payload.len() / 4 * 3 > MAX_IMAGE_BYTES + 3 {
        return Err(too_large());
    }
    let data = data_encoding::BASE64
        .decode(payload.as_bytes())
        .map_err(|_| invalid())?;
    if data.len() > MAX_IMAGE_BYTES {
        return Err(too_large());
    }

    let original_name = upload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let ext = mime_type.trim_start_matches("image/");
            format!("{}.{}", fallback_name, ext)
        });

    Ok(StoredImage {
        data,
        mime_type,
        original_name,
    })
}

fn too_large() -> NewsServiceError {
    NewsServiceError::ValidationError("File too large. Maximum size is 5MB per file.".to_string())
}

fn not_found(kind: NewsKind) -> NewsServiceError {
    NewsServiceError::NotFound(format!("{} not found", kind.label()))
}

fn required(value: String, field: &str) -> Result<String, NewsServiceError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(NewsServiceError::ValidationError(format!("{} cannot be empty", field)));
    }
    Ok(value)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn clean_paragraphs(paragraphs: Vec<String>) -> Vec<String> {
    paragraphs
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxNewsRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> NewsService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        NewsService::new(
            SqlxNewsRepository::boxed(pool),
            Arc::new(Cache::Memory(MemoryCache::new())),
        )
    }

    fn upload(bytes: &[u8], name: Option<&str>) -> ImageUpload {
        ImageUpload {
            data_url: format!("data:image/png;base64,{}", data_encoding::BASE64.encode(bytes)),
            name: name.map(str::to_string),
        }
    }

    fn input(kind: NewsKind, slug: &str) -> CreateNewsInput {
        let taxonomy = kind.requires_taxonomy();
        CreateNewsInput {
            slug: Some(slug.into()),
            title: Some(format!("Title {}", slug)),
            excerpt: Some("Excerpt".into()),
            date: Some("2024-05-01".into()),
            time: Some("10:00".into()),
            paragraphs: vec!["One".into(), "  ".into(), "Two".into()],
            page: taxonomy.then(|| "home".to_string()),
            category: taxonomy.then(|| "Politics".to_string()),
            tag: taxonomy.then(|| "breaking".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_image() {
        let image = decode_image(&upload(b"\x89PNG", Some("cover.png")), "thumb").unwrap();
        assert_eq!(image.data, b"\x89PNG");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.original_name, "cover.png");

        let unnamed = decode_image(&upload(b"abc", None), "thumb").unwrap();
        assert_eq!(unnamed.original_name, "thumb.png");

        let pdf = ImageUpload {
            data_url: "data:application/pdf;base64,AAAA".into(),
            name: None,
        };
        assert_eq!(
            decode_image(&pdf, "thumb").unwrap_err().to_string(),
            "Only image files are allowed"
        );

        let garbage = ImageUpload {
            data_url: "data:image/png;base64,@@@".into(),
            name: None,
        };
        assert!(decode_image(&garbage, "thumb").is_err());
    }

    #[test]
    fn test_decode_image_rejects_oversized() {
        let big = vec![0u8; MAX_IMAGE_BYTES + 1];
        let err = decode_image(&upload(&big, None), "thumb").unwrap_err();
        assert_eq!(err.to_string(), "File too large. Maximum size is 5MB per file.");
    }

    #[tokio::test]
    async fn test_create_requires_taxonomy_for_regular() {
        let service = setup().await;
        let mut missing = input(NewsKind::Regular, "a");
        missing.tag = None;
        missing.title = Some("  ".into());
        let err = service.create(NewsKind::Regular, missing).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: title, tag");

        let main = service.create(NewsKind::Main, input(NewsKind::Main, "a")).await.unwrap();
        assert_eq!(main.page, None);
        assert_eq!(main.paragraphs, vec!["One", "Two"]);
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_per_kind() {
        let service = setup().await;
        service.create(NewsKind::Sub, input(NewsKind::Sub, "story")).await.unwrap();
        let err = service
            .create(NewsKind::Sub, input(NewsKind::Sub, "story"))
            .await
            .unwrap_err();
        assert!(matches!(err, NewsServiceError::DuplicateSlug(NewsKind::Sub)));
        assert_eq!(err.to_string(), "Sub news article with this slug already exists");

        assert!(service.create(NewsKind::Mini, input(NewsKind::Mini, "story")).await.is_ok());
    }

    #[tokio::test]
    async fn test_thumb_and_gallery() {
        let service = setup().await;
        let mut create = input(NewsKind::Regular, "gallery");
        create.thumb = Some(upload(b"thumb", Some("t.png")));
        create.images = vec![upload(b"one", None), upload(b"two", None)];
        let news = service.create(NewsKind::Regular, create).await.unwrap();

        let thumb = service.thumb(NewsKind::Regular, news.id).await.unwrap();
        assert_eq!(thumb.data, b"thumb");
        let second = service.image(NewsKind::Regular, news.id, 1).await.unwrap();
        assert_eq!(second.data, b"two");
        assert_eq!(second.original_name, "image-2.png");

        let err = service.image(NewsKind::Regular, news.id, 5).await.unwrap_err();
        assert_eq!(err.to_string(), "Image not found");

        let bare = service.create(NewsKind::Trending, input(NewsKind::Trending, "bare")).await.unwrap();
        let err = service.thumb(NewsKind::Trending, bare.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Thumbnail not found");

        let mut gallery_on_main = input(NewsKind::Main, "m");
        gallery_on_main.images = vec![upload(b"x", None)];
        assert!(matches!(
            service.create(NewsKind::Main, gallery_on_main).await,
            Err(NewsServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_update_rules() {
        let service = setup().await;
        let first = service.create(NewsKind::Main, input(NewsKind::Main, "first")).await.unwrap();
        service.create(NewsKind::Main, input(NewsKind::Main, "second")).await.unwrap();

        let err = service
            .update(NewsKind::Main, first.id, UpdateNewsInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No valid fields provided for update");

        let clash = UpdateNewsInput {
            slug: Some("second".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(NewsKind::Main, first.id, clash).await,
            Err(NewsServiceError::DuplicateSlug(_))
        ));

        let retitled = service
            .update(
                NewsKind::Main,
                first.id,
                UpdateNewsInput {
                    title: Some("Fresh".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(retitled.title, "Fresh");
        assert_eq!(retitled.slug, "first");
    }

    #[tokio::test]
    async fn test_soft_delete_restore_and_hard_delete() {
        let service = setup().await;
        let news = service.create(NewsKind::Sub, input(NewsKind::Sub, "s")).await.unwrap();

        service.soft_delete(NewsKind::Sub, news.id).await.unwrap();
        assert!(service.list_active(NewsKind::Sub).await.unwrap().is_empty());
        assert_eq!(service.list_deleted(NewsKind::Sub).await.unwrap().len(), 1);
        assert!(service.get_active_by_slug(NewsKind::Sub, "s").await.is_err());

        service
            .update(
                NewsKind::Sub,
                news.id,
                UpdateNewsInput {
                    is_active: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(service.list_by_category(NewsKind::Sub, "politics").await.unwrap().len(), 1);

        service.hard_delete(NewsKind::Sub, news.id).await.unwrap();
        assert!(service.list_deleted(NewsKind::Sub).await.unwrap().is_empty());
        let err = service.get(NewsKind::Sub, news.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Sub news article not found");
        assert!(service.hard_delete(NewsKind::Sub, news.id).await.is_err());
    }

    #[tokio::test]
    async fn test_combined_pagination() {
        let service = setup().await;
        for (i, kind) in NewsKind::ALL.into_iter().enumerate() {
            service.create(kind, input(kind, &format!("n{}", i))).await.unwrap();
        }
        let hidden = service.create(NewsKind::Main, input(NewsKind::Main, "hidden")).await.unwrap();
        service.soft_delete(NewsKind::Main, hidden.id).await.unwrap();

        let first = service.combined(None, Some(2)).await.unwrap();
        assert_eq!(first.total_count, 5);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.page, 1);
        assert_eq!(first.data.len(), 2);
        assert_eq!(first.breakdown.main, 1);

        let last = service.combined(Some(3), Some(2)).await.unwrap();
        assert_eq!(last.data.len(), 1);

        let defaults = service.combined(Some(0), None).await.unwrap();
        assert_eq!(defaults.page, 1);
        assert_eq!(defaults.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(defaults.data.len(), 5);
    }

    #[tokio::test]
    async fn test_combined_with_huge_limit() {
        let service = setup().await;
        service.create(NewsKind::Main, input(NewsKind::Main, "a")).await.unwrap();
        service.create(NewsKind::Main, input(NewsKind::Main, "b")).await.unwrap();

        let page = service.combined(Some(1), Some(i64::MAX)).await.unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.data.len(), 2);

        let beyond = service.combined(Some(i64::MAX), Some(i64::MAX)).await.unwrap();
        assert!(beyond.data.is_empty());
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 50), 0);
        assert_eq!(page_count(5, 2), 3);
        assert_eq!(page_count(4, 2), 2);
        assert_eq!(page_count(i64::MAX, i64::MAX), 1);
        assert_eq!(page_count(i64::MAX, 1), i64::MAX);
    }
}
