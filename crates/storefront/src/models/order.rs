//! Orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use knotwork_core::cart::PricedLine;
use knotwork_core::{CurrencyCode, OrderId, OrderStatus, ProductId, UserId};

use super::CartItem;

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub shipping_info: ShippingInfo,
    pub payment_info: PaymentInfo,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// A line of an order, frozen at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            price: item.price,
            quantity: item.quantity,
        }
    }
}

impl PricedLine for OrderItem {
    fn unit_price(&self) -> Decimal {
        self.price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// Delivery address collected at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl ShippingInfo {
    /// Trim every field.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            full_name: self.full_name.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            address: self.address.trim().to_owned(),
            city: self.city.trim().to_owned(),
            state: self.state.trim().to_owned(),
            postal_code: self.postal_code.trim().to_owned(),
        }
    }

    /// Name and address on one line.
    #[must_use]
    pub fn one_line(&self) -> String {
        format!(
            "{}, {}, {}, {} {}",
            self.full_name, self.address, self.city, self.state, self.postal_code
        )
    }

    /// Labels of required fields left blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("full name", &self.full_name),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("postal code", &self.postal_code),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(label, _)| label)
        .collect()
    }
}

/// Record of the payment that paid for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub payment_id: String,
    /// Amount the widget was asked to collect, in minor units.
    pub amount_minor: i64,
    pub currency: CurrencyCode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields() {
        let info = ShippingInfo {
            full_name: "Asha".to_string(),
            phone: " ".to_string(),
            address: "12 Loom Street".to_string(),
            city: "Pune".to_string(),
            state: String::new(),
            postal_code: "411001".to_string(),
        };
        assert_eq!(info.missing_fields(), vec!["phone", "state"]);
        assert!(ShippingInfo::default().missing_fields().len() == 6);
    }
}
