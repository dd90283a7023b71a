//! Cart repository.
//!
//! Each user's cart is its own collection, `carts/{userId}/items`, with one
//! document per product.

use serde_json::json;

use knotwork_core::cart::LineChange;
use knotwork_core::{ProductId, UserId};

use super::{RepositoryError, collections, fields};
use crate::models::CartItem;
use crate::store::{DocumentStore, Query};

/// Repository for cart rows.
pub struct CartRepository<'a> {
    store: &'a DocumentStore,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Every row in the user's cart, in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or a row is malformed.
    pub async fn items(&self, user_id: &UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let query = Query::collection(collections::cart_items(user_id));
        Ok(self.store.query_as(&query).await?)
    }

    /// One row, if present.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or the row is malformed.
    pub async fn item(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        Ok(self
            .store
            .get_as(&collections::cart_items(user_id), product_id.as_str())
            .await?)
    }

    /// Write a whole row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn put(&self, user_id: &UserId, item: &CartItem) -> Result<(), RepositoryError> {
        Ok(self
            .store
            .set_as(
                &collections::cart_items(user_id),
                item.product_id.as_str(),
                item,
            )
            .await?)
    }

    /// Apply a quantity change: store the new quantity or delete the row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if setting a quantity on a missing row.
    pub async fn apply(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        change: LineChange,
    ) -> Result<(), RepositoryError> {
        let collection = collections::cart_items(user_id);
        match change {
            LineChange::Set(quantity) => {
                let update = fields([("quantity", json!(quantity))]);
                self.store
                    .update(&collection, product_id.as_str(), update)
                    .await?;
            }
            LineChange::Remove => {
                self.store.delete(&collection, product_id.as_str()).await?;
            }
        }
        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn clear(&self, user_id: &UserId) -> Result<(), RepositoryError> {
        let collection = collections::cart_items(user_id);
        let rows = self.store.query(&Query::collection(collection.clone())).await?;
        for row in rows {
            self.store.delete(&collection, &row.id).await?;
        }
        Ok(())
    }
}
