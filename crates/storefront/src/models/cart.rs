//! Cart rows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use knotwork_core::ProductId;
use knotwork_core::cart::PricedLine;

use super::Product;

/// One product in a user's cart, stored at `carts/{uid}/items/{productId}`.
///
/// Name, price and image are copied from the product when the row is
/// created, so later catalog edits do not change what is in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    pub quantity: u32,
}

impl CartItem {
    /// A fresh row for `product`.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.cover_image().map(str::to_owned),
            quantity,
        }
    }
}

impl PricedLine for CartItem {
    fn unit_price(&self) -> Decimal {
        self.price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}
