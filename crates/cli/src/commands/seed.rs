//! Seed the catalog from a YAML file.
//!
//! # Usage
//!
//! ```bash
//! kw-cli seed --file catalog.yaml
//! ```
//!
//! # File format
//!
//! ```yaml
//! products:
//!   - id: cotton-cord-3mm        # optional; a random id is used when absent
//!     name: Cotton cord 3mm
//!     description: Single twist, 100 m
//!     price: "450"
//!     original_price: "520"      # optional
//!     category: Cord             # optional
//!     in_stock: true             # optional, default true
//!     images:
//!       - https://i.ibb.co/abc/cord.jpg
//! courses:
//!   - title: Macrame basics
//!     price: "999"
//!     videos:
//!       - https://youtu.be/dQw4w9WgXcQ
//! ```
//!
//! The whole file is validated before anything is written. Entries with an
//! `id` overwrite the stored document, so re-running a file is safe.

use std::path::Path;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use knotwork_core::rating::RatingAggregate;
use knotwork_core::{CourseId, ProductId};
use knotwork_storefront::db::{CourseRepository, ProductRepository, RepositoryError};
use knotwork_storefront::models::catalog::{MAX_PRODUCT_IMAGES, MIN_PRODUCT_IMAGES};
use knotwork_storefront::models::{Course, CourseVideo, Product};
use knotwork_storefront::store::DocumentStore;

use super::{ConnectError, connect_store};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// One or more entries failed validation.
    #[error("{} invalid entries:\n  {}", .0.len(), .0.join("\n  "))]
    Invalid(Vec<String>),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Top level of a catalog file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub products: Vec<ProductEntry>,
    #[serde(default)]
    pub courses: Vec<CourseEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductEntry {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CourseEntry {
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub videos: Vec<String>,
}

const fn default_true() -> bool {
    true
}

/// Validated documents ready to write.
#[derive(Debug)]
pub struct Catalog {
    pub products: Vec<Product>,
    pub courses: Vec<Course>,
}

impl CatalogFile {
    /// Turn every entry into a document, collecting all problems.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Invalid` listing every bad entry.
    pub fn into_catalog(self) -> Result<Catalog, SeedError> {
        let mut problems = Vec::new();
        let now = Utc::now();

        let products = self
            .products
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let label = format!("products[{index}] ({})", entry.name);
                match product(entry, now) {
                    Ok(product) => Some(product),
                    Err(problem) => {
                        problems.push(format!("{label}: {problem}"));
                        None
                    }
                }
            })
            .collect();

        let courses = self
            .courses
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let label = format!("courses[{index}] ({})", entry.title);
                match course(entry, now) {
                    Ok(course) => Some(course),
                    Err(problem) => {
                        problems.push(format!("{label}: {problem}"));
                        None
                    }
                }
            })
            .collect();

        if problems.is_empty() {
            Ok(Catalog { products, courses })
        } else {
            Err(SeedError::Invalid(problems))
        }
    }
}

fn product(entry: ProductEntry, now: chrono::DateTime<Utc>) -> Result<Product, String> {
    if entry.name.trim().is_empty() {
        return Err("name is required".to_owned());
    }
    if entry.price <= Decimal::ZERO {
        return Err("price must be positive".to_owned());
    }
    if !(MIN_PRODUCT_IMAGES..=MAX_PRODUCT_IMAGES).contains(&entry.images.len()) {
        return Err(format!(
            "needs {MIN_PRODUCT_IMAGES} to {MAX_PRODUCT_IMAGES} images, found {}",
            entry.images.len()
        ));
    }

    Ok(Product {
        id: entry.id.map_or_else(ProductId::generate, ProductId::new),
        name: entry.name.trim().to_owned(),
        description: entry.description,
        price: entry.price,
        original_price: entry.original_price,
        images: entry.images,
        category: entry.category,
        in_stock: entry.in_stock,
        rating: RatingAggregate::default(),
        created_at: now,
    })
}

fn course(entry: CourseEntry, now: chrono::DateTime<Utc>) -> Result<Course, String> {
    if entry.title.trim().is_empty() {
        return Err("title is required".to_owned());
    }
    if entry.price <= Decimal::ZERO {
        return Err("price must be positive".to_owned());
    }
    if entry.videos.is_empty() {
        return Err("needs at least one video".to_owned());
    }

    let videos = entry
        .videos
        .iter()
        .enumerate()
        .map(|(index, url)| {
            CourseVideo::from_url(url).ok_or_else(|| format!("videos[{index}] is not a video link"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Course {
        id: entry.id.map_or_else(CourseId::generate, CourseId::new),
        title: entry.title.trim().to_owned(),
        description: entry.description,
        price: entry.price,
        videos,
        created_at: now,
    })
}

/// Read, validate and write a catalog file.
///
/// # Errors
///
/// Returns `SeedError` if the file is unreadable or invalid, or a write fails.
pub async fn run(path: &Path) -> Result<(), SeedError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;
    let catalog = file.into_catalog()?;
    tracing::info!(
        products = catalog.products.len(),
        courses = catalog.courses.len(),
        "Catalog validated"
    );

    let store = connect_store().await?;
    write(&store, &catalog).await?;

    tracing::info!("Seeding complete");
    Ok(())
}

async fn write(store: &DocumentStore, catalog: &Catalog) -> Result<(), SeedError> {
    let products = ProductRepository::new(store);
    for product in &catalog.products {
        products.save(product).await?;
        tracing::info!(id = %product.id, name = %product.name, "Product saved");
    }

    let courses = CourseRepository::new(store);
    for course in &catalog.courses {
        courses.save(course).await?;
        tracing::info!(id = %course.id, title = %course.title, "Course saved");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
products:
  - id: cotton-cord
    name: Cotton cord 3mm
    price: "450"
    original_price: "520"
    category: Cord
    images:
      - https://i.ibb.co/abc/cord.jpg
courses:
  - id: basics
    title: Macrame basics
    price: "999"
    videos:
      - https://youtu.be/dQw4w9WgXcQ
      - https://www.youtube.com/watch?v=9bZkp7q19f0
"#;

    #[test]
    fn test_parses_sample() {
        let file: CatalogFile = serde_yaml::from_str(SAMPLE).unwrap();
        let catalog = file.into_catalog().unwrap();

        assert_eq!(catalog.products.len(), 1);
        assert!(catalog.products[0].in_stock);
        assert!(catalog.products[0].on_sale());
        assert_eq!(catalog.courses[0].videos.len(), 2);
        assert_eq!(catalog.courses[0].id, CourseId::new("basics"));
    }

    #[test]
    fn test_collects_every_problem() {
        let yaml = r#"
products:
  - name: No pictures
    price: "10"
courses:
  - title: Broken
    price: "10"
    videos:
      - https://example.com/clip
"#;
        let file: CatalogFile = serde_yaml::from_str(yaml).unwrap();
        let Err(SeedError::Invalid(problems)) = file.into_catalog() else {
            panic!("expected validation failure");
        };
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("images"));
        assert!(problems[1].contains("videos[0]"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = "products:\n  - name: x\n    price: \"1\"\n    colour: red\n";
        assert!(serde_yaml::from_str::<CatalogFile>(yaml).is_err());
    }

    #[tokio::test]
    async fn test_write_is_repeatable() {
        let store = DocumentStore::memory();
        let file: CatalogFile = serde_yaml::from_str(SAMPLE).unwrap();
        let catalog = file.into_catalog().unwrap();

        write(&store, &catalog).await.unwrap();
        write(&store, &catalog).await.unwrap();

        let products = ProductRepository::new(&store).list().await.unwrap();
        assert_eq!(products.len(), 1);
    }
}
