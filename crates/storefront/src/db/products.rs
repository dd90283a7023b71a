//! Product repository.

use serde_json::json;

use knotwork_core::ProductId;
use knotwork_core::rating::RatingAggregate;

use super::{RepositoryError, collections, fields};
use crate::models::Product;
use crate::store::{Direction, DocumentStore, Query};

/// Repository for the shop catalog.
pub struct ProductRepository<'a> {
    store: &'a DocumentStore,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or a document is malformed.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let query = Query::collection(collections::PRODUCTS).order_by("createdAt", Direction::Descending);
        Ok(self.store.query_as(&query).await?)
    }

    /// Newest products, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or a document is malformed.
    pub async fn latest(&self, limit: usize) -> Result<Vec<Product>, RepositoryError> {
        let query = Query::collection(collections::PRODUCTS)
            .order_by("createdAt", Direction::Descending)
            .limit(limit);
        Ok(self.store.query_as(&query).await?)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or the document is malformed.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.store.get_as(collections::PRODUCTS, id.as_str()).await?)
    }

    /// Insert or replace a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn save(&self, product: &Product) -> Result<(), RepositoryError> {
        Ok(self
            .store
            .set_as(collections::PRODUCTS, product.id.as_str(), product)
            .await?)
    }

    /// Overwrite the rating aggregate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn set_rating(
        &self,
        id: &ProductId,
        rating: RatingAggregate,
    ) -> Result<(), RepositoryError> {
        let update = fields([
            ("averageRating", json!(rating.average_rating)),
            ("ratingsCount", json!(rating.ratings_count)),
        ]);
        Ok(self
            .store
            .update(collections::PRODUCTS, id.as_str(), update)
            .await?)
    }

    /// Delete a product. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn delete(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        Ok(self.store.delete(collections::PRODUCTS, id.as_str()).await?)
    }
}
