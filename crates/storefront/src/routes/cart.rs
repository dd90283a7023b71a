//! Cart route handlers.
//!
//! Carts require a signed-in user; guests are sent to the login page by
//! [`RequireAuth`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use knotwork_core::cart::{MAX_LINE_QUANTITY, PricedLine};
use knotwork_core::{CurrencyCode, ProductId};

use super::{MessageQuery, Page, money};
use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, RequireAuth};
use crate::models::CartItem;
use crate::services::cart::{CartError, CartService, CartSummary};
use crate::state::AppState;

/// Cart line as displayed.
#[derive(Debug, Clone)]
pub struct CartItemView {
    pub product_id: String,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
    pub at_max: bool,
}

impl CartItemView {
    fn new(item: &CartItem, currency: CurrencyCode) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            name: item.name.clone(),
            image: item.image.clone(),
            quantity: item.quantity,
            price: money(item.price, currency),
            line_total: money(item.line_total(), currency),
            at_max: item.quantity >= MAX_LINE_QUANTITY,
        }
    }
}

/// Cart with formatted totals.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub count: u32,
}

impl CartView {
    #[must_use]
    pub fn new(summary: &CartSummary, currency: CurrencyCode) -> Self {
        Self {
            items: summary
                .items
                .iter()
                .map(|item| CartItemView::new(item, currency))
                .collect(),
            total: money(summary.total, currency),
            count: summary.count,
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub page: Page,
    pub cart: CartView,
}

/// Add-to-cart form.
#[derive(Debug, Deserialize)]
pub struct AddForm {
    pub product_id: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

/// Display the cart.
#[instrument(skip(state, user, nonce), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    nonce: CspNonce,
    Query(query): Query<MessageQuery>,
) -> Result<CartTemplate> {
    let summary = CartService::new(state.store()).summary(&user.id).await?;
    Ok(CartTemplate {
        cart: CartView::new(&summary, state.config().payment.currency),
        page: Page::new(Some(user), &nonce).with_messages(&query),
    })
}

/// Add a product to the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddForm>,
) -> Result<Response> {
    let product_id = ProductId::new(form.product_id);
    match CartService::new(state.store())
        .add(&user.id, &product_id, form.quantity)
        .await
    {
        Ok(()) => Ok(Redirect::to("/cart?success=added").into_response()),
        Err(CartError::OutOfStock(_)) => {
            Ok(Redirect::to(&format!("/products/{product_id}?error=out_of_stock")).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Increase a line by one.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn increment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<String>,
) -> Result<Redirect> {
    CartService::new(state.store())
        .increment(&user.id, &ProductId::new(product_id))
        .await?;
    Ok(Redirect::to("/cart"))
}

/// Decrease a line by one; a line at one is removed.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn decrement(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<String>,
) -> Result<Redirect> {
    CartService::new(state.store())
        .decrement(&user.id, &ProductId::new(product_id))
        .await?;
    Ok(Redirect::to("/cart"))
}

/// Remove a line.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<String>,
) -> Result<Redirect> {
    CartService::new(state.store())
        .remove(&user.id, &ProductId::new(product_id))
        .await?;
    Ok(Redirect::to("/cart"))
}
