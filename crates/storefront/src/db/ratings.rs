//! Rating and review repositories.

use knotwork_core::{ProductId, RatingId, UserId};

use super::{RepositoryError, collections};
use crate::models::{RatingRecord, Review};
use crate::store::{Direction, DocumentStore, Query, StoreError};

/// Repository for per-user product ratings.
pub struct RatingRepository<'a> {
    store: &'a DocumentStore,
}

impl<'a> RatingRepository<'a> {
    /// Create a new rating repository.
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// The user's rating of a product, if they left one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or the document is malformed.
    pub async fn get(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Option<RatingRecord>, RepositoryError> {
        let id = RatingId::for_pair(user_id, product_id);
        Ok(self.store.get_as(collections::RATINGS, id.as_str()).await?)
    }

    /// Record a rating unless the user already rated this product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a rating already exists.
    pub async fn create(&self, record: &RatingRecord) -> Result<(), RepositoryError> {
        let created = self
            .store
            .create(
                collections::RATINGS,
                record.id.as_str(),
                serde_json::to_value(record).map_err(StoreError::from)?,
            )
            .await?;
        if created {
            Ok(())
        } else {
            Err(RepositoryError::Conflict(format!(
                "rating {} already exists",
                record.id
            )))
        }
    }
}

/// Repository for written reviews.
pub struct ReviewRepository<'a> {
    store: &'a DocumentStore,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Store a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn create(&self, review: &Review) -> Result<(), RepositoryError> {
        Ok(self
            .store
            .set_as(collections::REVIEWS, review.id.as_str(), review)
            .await?)
    }

    /// A product's reviews, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or a document is malformed.
    pub async fn list_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let query = Query::collection(collections::REVIEWS)
            .where_eq("productId", product_id.as_str())
            .order_by("createdAt", Direction::Descending);
        Ok(self.store.query_as(&query).await?)
    }
}
