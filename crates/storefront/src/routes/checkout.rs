//! Checkout route handlers.
//!
//! Three steps: shipping form, payment widget, confirmation. The priced
//! checkout is held in the session between the second and third step so the
//! amount recorded is the amount the widget charged.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use knotwork_core::{OrderId, Price};

use super::cart::CartView;
use super::{MessageQuery, Page, money};
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CspNonce, RequireAuth};
use crate::models::{PendingCheckout, ShippingInfo, session_keys};
use crate::services::cart::CartService;
use crate::services::checkout::{CheckoutError, CheckoutService};
use crate::services::messaging::{order_message, whatsapp_link};
use crate::services::payment::{PaymentConfirmation, Prefill, WidgetOptions};
use crate::state::AppState;

/// Shipping form page.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/shipping.html")]
pub struct ShippingTemplate {
    pub page: Page,
    pub cart: CartView,
    pub shipping: ShippingInfo,
}

/// Payment page: opens the widget.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/pay.html")]
pub struct PaymentTemplate {
    pub page: Page,
    pub amount: String,
    pub shipping: ShippingInfo,
    /// Widget options JSON, embedded in a data block.
    pub options_json: String,
    pub script_url: String,
    pub confirm_url: String,
}

/// Order confirmation page.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub page: Page,
    pub order: OrderView,
    pub chat_link: String,
}

/// An order as displayed.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: String,
    pub date: String,
    pub status: String,
    pub total: String,
    pub lines: Vec<OrderLineView>,
    pub ship_to: String,
}

/// One order line as displayed.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub name: String,
    pub quantity: u32,
    pub price: String,
}

impl OrderView {
    #[must_use]
    pub fn new(order: &crate::models::Order, currency: knotwork_core::CurrencyCode) -> Self {
        Self {
            id: order.id.to_string(),
            date: order.created_at.format("%-d %b %Y").to_string(),
            status: order.status.as_str().to_owned(),
            total: money(order.total, currency),
            lines: order
                .items
                .iter()
                .map(|item| OrderLineView {
                    name: item.name.clone(),
                    quantity: item.quantity,
                    price: money(item.price, currency),
                })
                .collect(),
            ship_to: order.shipping_info.one_line(),
        }
    }
}

/// Posted by the widget's success handler.
#[derive(Debug, Deserialize)]
pub struct ConfirmForm {
    pub payment_id: String,
}

/// Display the shipping form.
#[instrument(skip(state, session, user, nonce), fields(user_id = %user.id))]
pub async fn shipping_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    nonce: CspNonce,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    let summary = CartService::new(state.store()).summary(&user.id).await?;
    if summary.is_empty() {
        return Ok(Redirect::to("/cart?error=empty_cart").into_response());
    }

    let shipping = session
        .get::<PendingCheckout>(session_keys::PENDING_CHECKOUT)
        .await?
        .map(|pending| pending.shipping)
        .unwrap_or_else(|| ShippingInfo {
            full_name: user.display_name.clone(),
            ..ShippingInfo::default()
        });

    Ok(ShippingTemplate {
        cart: CartView::new(&summary, state.config().payment.currency),
        page: Page::new(Some(user), &nonce).with_messages(&query),
        shipping,
    }
    .into_response())
}

/// Validate shipping, price the cart and open the payment widget.
#[instrument(skip(state, session, user, nonce, shipping), fields(user_id = %user.id))]
pub async fn start_payment(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    nonce: CspNonce,
    Form(shipping): Form<ShippingInfo>,
) -> Result<Response> {
    let payment = &state.config().payment;
    let pending = match CheckoutService::new(state.store())
        .prepare_order(&user.id, shipping, payment.currency)
        .await
    {
        Ok(pending) => pending,
        Err(CheckoutError::MissingShipping(missing)) => {
            tracing::debug!(?missing, "Shipping form incomplete");
            return Ok(Redirect::to("/checkout?error=shipping").into_response());
        }
        Err(CheckoutError::EmptyCart) => {
            return Ok(Redirect::to("/cart?error=empty_cart").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let amount = Price::from_minor_units(pending.amount_minor, payment.currency).amount;
    let options = WidgetOptions::new(
        payment,
        amount,
        "Craft supplies order",
        Prefill {
            name: pending.shipping.full_name.clone(),
            email: user.email.as_str().to_owned(),
            contact: pending.shipping.phone.clone(),
        },
    )?
    .with_note("userId", user.id.as_str());
    let options_json = options
        .to_json()
        .map_err(|e| AppError::Internal(format!("widget options: {e}")))?;

    session
        .insert(session_keys::PENDING_CHECKOUT, &pending)
        .await?;

    Ok(PaymentTemplate {
        amount: money(amount, payment.currency),
        shipping: pending.shipping,
        options_json,
        script_url: payment.script_url.clone(),
        confirm_url: "/checkout/confirm".to_string(),
        page: Page::new(Some(user), &nonce),
    }
    .into_response())
}

/// Record the paid order.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ConfirmForm>,
) -> Result<Response> {
    let Some(pending) = session
        .remove::<PendingCheckout>(session_keys::PENDING_CHECKOUT)
        .await?
    else {
        return Ok(Redirect::to("/checkout?error=checkout_expired").into_response());
    };

    let confirmation = match PaymentConfirmation::parse(&form.payment_id) {
        Ok(confirmation) => confirmation,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected payment confirmation");
            return Ok(Redirect::to("/checkout?error=payment").into_response());
        }
    };

    let order = match CheckoutService::new(state.store())
        .place_order(&user.id, pending, &confirmation, state.config().payment.currency)
        .await
    {
        Ok(order) => order,
        Err(CheckoutError::EmptyCart) => {
            tracing::error!(
                payment_id = confirmation.payment_id(),
                "Payment confirmed against an empty cart"
            );
            return Ok(Redirect::to("/cart?error=payment").into_response());
        }
        Err(e @ CheckoutError::AmountMismatch { .. }) => {
            tracing::error!(
                error = %e,
                payment_id = confirmation.payment_id(),
                "Pending checkout does not match charge"
            );
            return Ok(Redirect::to("/checkout?error=payment").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Redirect::to(&format!("/orders/{}", order.id)).into_response())
}

/// Show a placed order with the chat hand-off link.
#[instrument(skip(state, user, nonce), fields(user_id = %user.id))]
pub async fn order_confirmation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    nonce: CspNonce,
    Path(id): Path<String>,
) -> Result<ConfirmationTemplate> {
    let id = OrderId::new(id);
    let order = OrderRepository::new(state.store())
        .get(&id)
        .await?
        .filter(|order| order.user_id == user.id)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    let config = state.config();
    let currency = config.payment.currency;
    Ok(ConfirmationTemplate {
        chat_link: whatsapp_link(
            &config.messaging.operator_number,
            &order_message(&order, currency),
        ),
        order: OrderView::new(&order, currency),
        page: Page::new(Some(user), &nonce),
    })
}
