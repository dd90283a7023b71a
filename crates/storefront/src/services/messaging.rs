//! Hand-off to the operator over WhatsApp.
//!
//! After a purchase the customer gets a link that opens a chat with the
//! operator, pre-filled with the order details. Nothing is sent by the
//! server and delivery is not tracked.

use std::fmt::Write as _;

use knotwork_core::CurrencyCode;
use knotwork_core::price::format_amount;

use crate::models::{Course, Enrollment, Order};

/// Deep link that opens a chat with `number` and `message` pre-filled.
#[must_use]
pub fn whatsapp_link(number: &str, message: &str) -> String {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    format!(
        "https://wa.me/{digits}?text={}",
        urlencoding::encode(message)
    )
}

/// Message summarizing a placed order.
#[must_use]
pub fn order_message(order: &Order, currency: CurrencyCode) -> String {
    let mut message = format!("Hi! I just placed order #{}.\n", order.id);
    for item in &order.items {
        let _ = writeln!(
            message,
            "- {} x{} ({})",
            item.name,
            item.quantity,
            format_amount(item.price, currency)
        );
    }
    let _ = write!(
        message,
        "Total: {}\nShip to: {}, {}, {} {}",
        format_amount(order.total, currency),
        order.shipping_info.full_name,
        order.shipping_info.city,
        order.shipping_info.state,
        order.shipping_info.postal_code,
    );
    message
}

/// Message announcing a course purchase.
#[must_use]
pub fn enrollment_message(course: &Course, enrollment: &Enrollment) -> String {
    format!(
        "Hi! I just enrolled in \"{}\" (payment {}).",
        course.title,
        enrollment.payment_id.as_deref().unwrap_or("pending")
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use knotwork_core::{OrderId, OrderStatus, ProductId, UserId};

    use super::*;
    use crate::models::{OrderItem, PaymentInfo, ShippingInfo};

    #[test]
    fn test_link_encodes_message() {
        let link = whatsapp_link("+91 98765-43210", "Order #1 & more");
        assert_eq!(
            link,
            "https://wa.me/919876543210?text=Order%20%231%20%26%20more"
        );
    }

    #[test]
    fn test_order_message_lists_items_and_total() {
        let order = Order {
            id: OrderId::new("o1"),
            user_id: UserId::new("u1"),
            items: vec![
                OrderItem {
                    product_id: ProductId::new("p1"),
                    name: "Merino skein".to_string(),
                    price: Decimal::from(100),
                    quantity: 2,
                },
                OrderItem {
                    product_id: ProductId::new("p2"),
                    name: "Bamboo needles".to_string(),
                    price: Decimal::from(50),
                    quantity: 1,
                },
            ],
            total: Decimal::from(250),
            shipping_info: ShippingInfo {
                full_name: "Asha Rao".to_string(),
                phone: "9876543210".to_string(),
                address: "12 Loom Street".to_string(),
                city: "Pune".to_string(),
                state: "MH".to_string(),
                postal_code: "411001".to_string(),
            },
            payment_info: PaymentInfo {
                payment_id: "pay_1".to_string(),
                amount_minor: 25_000,
                currency: CurrencyCode::INR,
            },
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        let message = order_message(&order, CurrencyCode::INR);
        assert!(message.contains("- Merino skein x2 (₹100.00)"));
        assert!(message.contains("Total: ₹250.00"));
        assert!(message.contains("Asha Rao, Pune, MH 411001"));
    }
}
