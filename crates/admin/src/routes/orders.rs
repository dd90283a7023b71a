//! Order list, status updates and the live order feed.

use std::convert::Infallible;

use askama::Template;
use askama_web::WebTemplate;
use async_stream::stream;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{
        Redirect, Sse,
        sse::{Event, KeepAlive},
    },
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use knotwork_core::{CurrencyCode, OrderId, OrderStatus};
use knotwork_storefront::db::{OrderRepository, RepositoryError};
use knotwork_storefront::models::Order;

use super::{AdminPage, MessageQuery, money};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// An order as shown in the table and sent over the live feed.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRow {
    pub id: String,
    pub date: String,
    pub customer: String,
    pub phone: String,
    pub ship_to: String,
    pub items: String,
    pub total: String,
    pub status: String,
    pub payment_id: String,
}

impl OrderRow {
    #[must_use]
    pub fn new(order: &Order, currency: CurrencyCode) -> Self {
        let items = order
            .items
            .iter()
            .map(|item| format!("{} x{}", item.name, item.quantity))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            id: order.id.to_string(),
            date: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
            customer: order.shipping_info.full_name.clone(),
            phone: order.shipping_info.phone.clone(),
            ship_to: order.shipping_info.one_line(),
            items,
            total: money(order.total, currency),
            status: order.status.as_str().to_owned(),
            payment_id: order.payment_info.payment_id.clone(),
        }
    }
}

/// Orders page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub page: AdminPage,
    pub orders: Vec<OrderRow>,
    pub suggested: &'static [&'static str],
}

/// Status form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// List every order, newest first.
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<OrdersTemplate> {
    let currency = state.config().currency;
    let orders = OrderRepository::new(state.store()).list_all().await?;

    Ok(OrdersTemplate {
        page: AdminPage::new(admin, "/orders").with_messages(&query),
        orders: orders.iter().map(|o| OrderRow::new(o, currency)).collect(),
        suggested: &OrderStatus::SUGGESTED,
    })
}

/// Set an order's status. Any non-blank text is accepted.
#[instrument(skip(admin, state, form), fields(admin = %admin.email))]
pub async fn update_status(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let Some(status) = OrderStatus::parse(&form.status) else {
        return Ok(Redirect::to("/orders?error=status_required"));
    };

    let id = OrderId::new(id);
    match OrderRepository::new(state.store())
        .update_status(&id, &status)
        .await
    {
        Ok(()) => {
            tracing::info!(order_id = %id, status = status.as_str(), "Order status updated");
            Ok(Redirect::to("/orders?success=status_updated"))
        }
        Err(RepositoryError::NotFound) => Ok(Redirect::to("/orders?error=not_found")),
        Err(e) => Err(e.into()),
    }
}

/// Push the full order list on connect and after every order write.
#[instrument(skip(_admin, state))]
pub async fn stream(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let currency = state.config().currency;
    let mut subscription = state
        .store()
        .subscribe(OrderRepository::all_orders_query())?;

    let events = stream! {
        while let Some(docs) = subscription.next().await {
            let rows: Vec<OrderRow> = docs
                .iter()
                .filter_map(|doc| match doc.decode::<Order>() {
                    Ok(order) => Some(OrderRow::new(&order, currency)),
                    Err(e) => {
                        tracing::warn!(error = %e, id = %doc.id, "Skipping malformed order");
                        None
                    }
                })
                .collect();

            match Event::default().event("orders").json_data(&rows) {
                Ok(event) => yield Ok(event),
                Err(e) => tracing::warn!(error = %e, "Failed to encode order snapshot"),
            }
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use knotwork_core::{ProductId, UserId};
    use knotwork_storefront::models::{OrderItem, PaymentInfo, ShippingInfo};

    use super::*;

    fn order() -> Order {
        Order {
            id: OrderId::new("o1"),
            user_id: UserId::new("u1"),
            items: vec![
                OrderItem {
                    product_id: ProductId::new("p1"),
                    name: "Cotton cord".to_owned(),
                    price: Decimal::new(150, 0),
                    quantity: 2,
                },
                OrderItem {
                    product_id: ProductId::new("p2"),
                    name: "Wooden ring".to_owned(),
                    price: Decimal::new(80, 0),
                    quantity: 1,
                },
            ],
            total: Decimal::new(380, 0),
            shipping_info: ShippingInfo {
                full_name: "Asha Rao".to_owned(),
                phone: "9876543210".to_owned(),
                address: "12 Lake Road".to_owned(),
                city: "Pune".to_owned(),
                state: "MH".to_owned(),
                postal_code: "411001".to_owned(),
            },
            payment_info: PaymentInfo {
                payment_id: "pay_123".to_owned(),
                amount_minor: 38000,
                currency: CurrencyCode::INR,
            },
            status: OrderStatus::Pending,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_order_row_summarises_items() {
        let row = OrderRow::new(&order(), CurrencyCode::INR);
        assert_eq!(row.items, "Cotton cord x2, Wooden ring x1");
        assert_eq!(row.date, "2026-03-01 09:30");
        assert_eq!(row.ship_to, "Asha Rao, 12 Lake Road, Pune, MH 411001");
        assert_eq!(row.status, "pending");
    }

    #[test]
    fn test_order_row_serializes_for_feed() {
        let row = OrderRow::new(&order(), CurrencyCode::INR);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["id"], "o1");
        assert_eq!(json["paymentId"], serde_json::Value::Null);
        assert_eq!(json["payment_id"], "pay_123");
    }
}
