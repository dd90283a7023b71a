//! Order repository.

use serde_json::json;

use knotwork_core::{OrderId, OrderStatus, UserId};

use super::{RepositoryError, collections, fields};
use crate::models::Order;
use crate::store::{Direction, DocumentStore, Query};

/// Repository for placed orders.
pub struct OrderRepository<'a> {
    store: &'a DocumentStore,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Query for every order, newest first. Shared by listings and live
    /// subscriptions.
    #[must_use]
    pub fn all_orders_query() -> Query {
        Query::collection(collections::ORDERS).order_by("createdAt", Direction::Descending)
    }

    /// Store a new order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn create(&self, order: &Order) -> Result<(), RepositoryError> {
        Ok(self
            .store
            .set_as(collections::ORDERS, order.id.as_str(), order)
            .await?)
    }

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or the document is malformed.
    pub async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.store.get_as(collections::ORDERS, id.as_str()).await?)
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or a document is malformed.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let query = Self::all_orders_query().where_eq("userId", user_id.as_str());
        Ok(self.store.query_as(&query).await?)
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or a document is malformed.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.store.query_as(&Self::all_orders_query()).await?)
    }

    /// Change an order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_status(
        &self,
        id: &OrderId,
        status: &OrderStatus,
    ) -> Result<(), RepositoryError> {
        let update = fields([("status", json!(status.as_str()))]);
        Ok(self.store.update(collections::ORDERS, id.as_str(), update).await?)
    }
}
