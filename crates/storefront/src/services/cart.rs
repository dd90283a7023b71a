//! Cart operations.
//!
//! Carts belong to signed-in users and live in the document store, so they
//! follow the user across devices.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use knotwork_core::cart::{self, LineChange};
use knotwork_core::{ProductId, UserId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::CartItem;
use crate::store::DocumentStore;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Product exists but cannot be bought right now.
    #[error("product out of stock: {0}")]
    OutOfStock(ProductId),

    /// Quantity must be at least one.
    #[error("invalid quantity")]
    InvalidQuantity,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A cart's rows with their totals.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub total: Decimal,
    pub count: u32,
}

impl CartSummary {
    fn from_items(items: Vec<CartItem>) -> Self {
        Self {
            total: cart::total(&items),
            count: cart::item_count(&items),
            items,
        }
    }

    /// Whether there is nothing to buy.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Cart service.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self {
            carts: CartRepository::new(store),
            products: ProductRepository::new(store),
        }
    }

    /// The user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn summary(&self, user_id: &UserId) -> Result<CartSummary, CartError> {
        Ok(CartSummary::from_items(self.carts.items(user_id).await?))
    }

    /// Add `quantity` of a product, merging with an existing row.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` or `CartError::OutOfStock` if the
    /// product cannot be added.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let product = self
            .products
            .get(product_id)
            .await?
            .ok_or_else(|| CartError::ProductNotFound(product_id.clone()))?;
        if !product.in_stock {
            return Err(CartError::OutOfStock(product_id.clone()));
        }

        match self.carts.item(user_id, product_id).await? {
            Some(existing) => {
                let change = cart::increment(existing.quantity, quantity);
                self.carts.apply(user_id, product_id, change).await?;
            }
            None => {
                let LineChange::Set(quantity) = cart::increment(0, quantity) else {
                    return Err(CartError::InvalidQuantity);
                };
                self.carts
                    .put(user_id, &CartItem::from_product(&product, quantity))
                    .await?;
            }
        }
        Ok(())
    }

    /// Raise a row's quantity by one. Missing rows are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn increment(&self, user_id: &UserId, product_id: &ProductId) -> Result<(), CartError> {
        if let Some(item) = self.carts.item(user_id, product_id).await? {
            self.carts
                .apply(user_id, product_id, cart::increment(item.quantity, 1))
                .await?;
        }
        Ok(())
    }

    /// Lower a row's quantity by one, deleting it at zero. Missing rows are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn decrement(&self, user_id: &UserId, product_id: &ProductId) -> Result<(), CartError> {
        if let Some(item) = self.carts.item(user_id, product_id).await? {
            self.carts
                .apply(user_id, product_id, cart::decrement(item.quantity, 1))
                .await?;
        }
        Ok(())
    }

    /// Delete a row.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: &UserId, product_id: &ProductId) -> Result<(), CartError> {
        self.carts
            .apply(user_id, product_id, LineChange::Remove)
            .await?;
        Ok(())
    }
}
