//! News article models
//!
//! The five news kinds share one record shape. Sub, mini and regular
//! articles additionally carry a page/category/tag taxonomy, and regular
//! articles own an ordered image gallery.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// News article kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsKind {
    Main,
    Regular,
    Sub,
    Mini,
    Trending,
}

impl NewsKind {
    pub const ALL: [NewsKind; 5] = [
        NewsKind::Main,
        NewsKind::Regular,
        NewsKind::Sub,
        NewsKind::Mini,
        NewsKind::Trending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NewsKind::Main => "main",
            NewsKind::Regular => "regular",
            NewsKind::Sub => "sub",
            NewsKind::Mini => "mini",
            NewsKind::Trending => "trending",
        }
    }

    /// URL prefix under `/api`
    pub fn route_prefix(&self) -> &'static str {
        match self {
            NewsKind::Main => "main-news",
            NewsKind::Regular => "news",
            NewsKind::Sub => "subnews",
            NewsKind::Mini => "mini-news",
            NewsKind::Trending => "trending-news",
        }
    }

    /// Whether `page`, `category` and `tag` are mandatory
    pub fn requires_taxonomy(&self) -> bool {
        matches!(self, NewsKind::Regular | NewsKind::Sub | NewsKind::Mini)
    }

    /// Whether articles of this kind carry an image gallery
    pub fn has_gallery(&self) -> bool {
        matches!(self, NewsKind::Regular)
    }

    pub fn supports_category_listing(&self) -> bool {
        self.requires_taxonomy()
    }

    /// Label used in messages, e.g. "Sub news article"
    pub fn label(&self) -> &'static str {
        match self {
            NewsKind::Main => "Main news article",
            NewsKind::Regular => "News article",
            NewsKind::Sub => "Sub news article",
            NewsKind::Mini => "Mini news article",
            NewsKind::Trending => "Trending news article",
        }
    }
}

impl fmt::Display for NewsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NewsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NewsKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown news kind: {}", s))
    }
}

/// Metadata of a stored image (the bytes are served separately)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageMeta {
    pub original_name: String,
    pub mimetype: String,
    pub size: i64,
}

/// Decoded image ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub original_name: String,
}

impl StoredImage {
    pub fn size(&self) -> i64 {
        self.data.len() as i64
    }

    pub fn meta(&self) -> ImageMeta {
        ImageMeta {
            original_name: self.original_name.clone(),
            mimetype: self.mime_type.clone(),
            size: self.size(),
        }
    }
}

/// A news article without image bytes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct News {
    pub id: i64,
    #[serde(rename = "newsType")]
    pub kind: NewsKind,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub date: String,
    pub time: String,
    pub paragraphs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub thumb: Option<ImageMeta>,
    /// Gallery of regular articles, in upload order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageMeta>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An image supplied inline as a base64 `data:` URL
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpload {
    pub data_url: String,
    pub name: Option<String>,
}

/// Input for creating a news article
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNewsInput {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub paragraphs: Vec<String>,
    pub video_url: Option<String>,
    pub page: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub thumb: Option<ImageUpload>,
    #[serde(default)]
    pub images: Vec<ImageUpload>,
}

/// Input for a partial news update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNewsInput {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    #[serde(default, deserialize_with = "optional_one_or_many")]
    pub paragraphs: Option<Vec<String>>,
    pub video_url: Option<String>,
    pub page: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub is_active: Option<bool>,
    pub thumb: Option<ImageUpload>,
    /// Replaces the whole gallery when present
    pub images: Option<Vec<ImageUpload>>,
}

impl UpdateNewsInput {
    /// Whether the update carries anything at all
    pub fn is_empty(&self) -> bool {
        self.slug.is_none()
            && self.title.is_none()
            && self.excerpt.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.paragraphs.is_none()
            && self.video_url.is_none()
            && self.page.is_none()
            && self.category.is_none()
            && self.tag.is_none()
            && self.is_active.is_none()
            && self.thumb.is_none()
            && self.images.is_none()
    }
}

/// Paragraphs may arrive as a single string or a list
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(items) => items,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(OneOrMany::deserialize(deserializer)?.into())
}

fn optional_one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<OneOrMany>::deserialize(deserializer)?.map(Into::into))
}

/// One page of the combined feed across all kinds
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedNewsPage {
    pub success: bool,
    pub total_count: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub data: Vec<News>,
    pub breakdown: NewsBreakdown,
}

/// Active article count per kind
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct NewsBreakdown {
    pub main: i64,
    pub regular: i64,
    pub sub: i64,
    pub mini: i64,
    pub trending: i64,
}

impl NewsBreakdown {
    pub fn set(&mut self, kind: NewsKind, count: i64) {
        match kind {
            NewsKind::Main => self.main = count,
            NewsKind::Regular => self.regular = count,
            NewsKind::Sub => self.sub = count,
            NewsKind::Mini => self.mini = count,
            NewsKind::Trending => self.trending = count,
        }
    }

    pub fn total(&self) -> i64 {
        self.main + self.regular + self.sub + self.mini + self.trending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip_through_str() {
        for kind in NewsKind::ALL {
            assert_eq!(kind.as_str().parse::<NewsKind>().unwrap(), kind);
        }
        assert!("breaking".parse::<NewsKind>().is_err());
    }

    #[test]
    fn test_kind_capabilities() {
        assert!(NewsKind::Regular.has_gallery());
        assert!(!NewsKind::Sub.has_gallery());
        assert!(NewsKind::Mini.requires_taxonomy());
        assert!(!NewsKind::Main.requires_taxonomy());
        assert!(!NewsKind::Trending.supports_category_listing());
    }

    #[test]
    fn test_update_input_is_empty() {
        let input: UpdateNewsInput = serde_json::from_str("{}").unwrap();
        assert!(input.is_empty());

        let input: UpdateNewsInput = serde_json::from_str(r#"{"isActive": true}"#).unwrap();
        assert!(!input.is_empty());
    }

    #[test]
    fn test_create_input_accepts_single_paragraph() {
        let input: CreateNewsInput =
            serde_json::from_str(r#"{"slug": "a", "paragraphs": "one, with a comma"}"#).unwrap();
        assert_eq!(input.paragraphs, vec!["one, with a comma".to_string()]);
    }

    #[test]
    fn test_breakdown_total() {
        let mut breakdown = NewsBreakdown::default();
        breakdown.set(NewsKind::Main, 2);
        breakdown.set(NewsKind::Trending, 3);
        assert_eq!(breakdown.total(), 5);
        assert_eq!(breakdown.main, 2);
    }
}
