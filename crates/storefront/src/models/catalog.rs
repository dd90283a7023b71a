//! Products and courses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use knotwork_core::rating::RatingAggregate;
use knotwork_core::video::VideoId;
use knotwork_core::{CourseId, ProductId};

/// Fewest images a product may have.
pub const MIN_PRODUCT_IMAGES: usize = 1;
/// Most images a product may have.
pub const MAX_PRODUCT_IMAGES: usize = 5;

/// A physical product in the shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    /// Pre-discount price, shown struck through when higher than `price`.
    #[serde(default)]
    pub original_price: Option<Decimal>,
    /// Hosted image URLs; the first is the cover.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(flatten)]
    pub rating: RatingAggregate,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// The cover image, if any.
    #[must_use]
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Whether the product is discounted.
    #[must_use]
    pub fn on_sale(&self) -> bool {
        self.original_price.is_some_and(|original| original > self.price)
    }
}

const fn default_true() -> bool {
    true
}

/// A paid video course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub videos: Vec<CourseVideo>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Course {
    /// Thumbnail of the first lesson, used on course cards.
    #[must_use]
    pub fn cover_thumbnail(&self) -> Option<String> {
        self.videos.first().and_then(CourseVideo::thumbnail)
    }
}

/// One lesson of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseVideo {
    pub youtube_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl CourseVideo {
    /// Build a lesson from a sharing URL, deriving its thumbnail.
    ///
    /// Returns `None` if no video id can be extracted.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let id = VideoId::from_url(url)?;
        Some(Self {
            youtube_url: url.trim().to_owned(),
            thumbnail_url: Some(id.thumbnail_url()),
        })
    }

    /// The lesson's video id.
    #[must_use]
    pub fn video_id(&self) -> Option<VideoId> {
        VideoId::from_url(&self.youtube_url)
    }

    /// Stored thumbnail, or one derived from the URL.
    #[must_use]
    pub fn thumbnail(&self) -> Option<String> {
        self.thumbnail_url
            .clone()
            .or_else(|| self.video_id().map(|id| id.thumbnail_url()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_product_reads_flattened_rating() {
        let product: Product = serde_json::from_value(json!({
            "id": "p1",
            "name": "Chunky yarn",
            "price": "450.00",
            "images": ["https://i.ibb.co/a.jpg"],
            "averageRating": 4.5,
            "ratingsCount": 2,
            "createdAt": 1_700_000_000_000_i64
        }))
        .unwrap();
        assert!(product.in_stock);
        assert_eq!(product.rating.ratings_count, 2);
        assert_eq!(product.cover_image(), Some("https://i.ibb.co/a.jpg"));
    }

    #[test]
    fn test_on_sale_needs_higher_original() {
        let mut product: Product = serde_json::from_value(json!({
            "id": "p1", "name": "Hook", "price": 100, "createdAt": 0
        }))
        .unwrap();
        assert!(!product.on_sale());
        product.original_price = Some(Decimal::from(120));
        assert!(product.on_sale());
        product.original_price = Some(Decimal::from(80));
        assert!(!product.on_sale());
    }

    #[test]
    fn test_course_video_from_url() {
        let video = CourseVideo::from_url(" https://youtu.be/dQw4w9WgXcQ ").unwrap();
        assert_eq!(video.youtube_url, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(
            video.thumbnail_url.as_deref(),
            Some("https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
        );
        assert!(CourseVideo::from_url("https://example.com/video").is_none());
    }
}
