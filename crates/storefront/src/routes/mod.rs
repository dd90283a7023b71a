//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Home page
//!
//! # Shop
//! GET  /products                      - Product listing
//! GET  /products/{id}                 - Product detail with reviews
//! POST /products/{id}/rate            - Rate once (auth)
//! POST /products/{id}/reviews         - Write a review (auth)
//!
//! # Cart (auth)
//! GET  /cart                          - Cart page
//! POST /cart/add                      - Add a product
//! POST /cart/{product_id}/increment   - Quantity +1
//! POST /cart/{product_id}/decrement   - Quantity -1, removes at zero
//! POST /cart/{product_id}/remove      - Remove line
//!
//! # Checkout (auth)
//! GET  /checkout                      - Shipping form
//! POST /checkout                      - Validate shipping, open payment widget
//! POST /checkout/confirm              - Record paid order
//! GET  /orders/{id}                   - Order confirmation with chat link
//!
//! # Courses
//! GET  /courses                       - Course listing
//! GET  /courses/{id}                  - Course detail / purchase
//! POST /courses/{id}/enroll           - Record paid enrollment (auth)
//! GET  /courses/{id}/watch            - Player, enrolled users only
//!
//! # Account (auth)
//! GET  /account                       - Profile, orders and courses
//! GET  /account/orders                - Order history
//!
//! # Auth
//! GET  /auth/login                    - Login page
//! POST /auth/login                    - Login action
//! GET  /auth/register                 - Register page
//! POST /auth/register                 - Register action
//! POST /auth/logout                   - Logout action
//! GET  /auth/forgot                   - Forgot password page
//! POST /auth/forgot                   - Send reset link
//! GET  /auth/reset                    - Reset password page
//! POST /auth/reset                    - Set new password
//!
//! # API
//! POST /api/session/check             - Single-active-session check (JSON)
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod courses;
pub mod home;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use knotwork_core::{CurrencyCode, Price};

use crate::middleware::{CspNonce, api_rate_limiter, auth_rate_limiter};
use crate::models::CurrentUser;
use crate::state::AppState;

// =============================================================================
// Shared page context
// =============================================================================

/// Query parameters for toast display.
///
/// Values are message codes, mapped to fixed text by [`flash_text`] so the
/// URL cannot inject arbitrary copy.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Fields every page template needs.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub user: Option<CurrentUser>,
    pub nonce: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl Page {
    /// Page context for the current request.
    #[must_use]
    pub fn new(user: Option<CurrentUser>, nonce: &CspNonce) -> Self {
        Self {
            user,
            nonce: nonce.value().to_owned(),
            error: None,
            success: None,
        }
    }

    /// Attach toasts from the query string.
    #[must_use]
    pub fn with_messages(mut self, query: &MessageQuery) -> Self {
        self.error = query.error.as_deref().map(flash_text);
        self.success = query.success.as_deref().map(flash_text);
        self
    }

    /// Attach an error toast.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Whether an admin is signed in.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user
            .as_ref()
            .is_some_and(|u| u.role == knotwork_core::UserRole::Admin)
    }
}

/// Text for a flash code.
#[must_use]
pub fn flash_text(code: &str) -> String {
    match code {
        "credentials" => "Invalid email or password.",
        "exists" => "An account with this email already exists.",
        "weak_password" => "Passwords must be at least 8 characters.",
        "mismatch" => "Passwords do not match.",
        "invalid_email" => "Please enter a valid email address.",
        "reset_sent" => "If an account exists for that email, a reset link is on its way.",
        "reset_invalid" => "This reset link is invalid or has expired.",
        "password_changed" => "Your password has been changed. Please sign in.",
        "signed_out" => "You have been signed out.",
        "superseded" => crate::services::session_guard::SUPERSEDED_MESSAGE,
        "added" => "Added to your cart.",
        "out_of_stock" => "That product is out of stock.",
        "empty_cart" => "Your cart is empty.",
        "shipping" => "Please fill in every shipping field.",
        "payment" => "We could not confirm your payment. If you were charged, please contact us.",
        "checkout_expired" => "Your checkout session expired. Please start again.",
        "rated" => "Thanks for rating!",
        "already_rated" => "You have already rated this product.",
        "invalid_rating" => "Ratings must be between 1 and 5 stars.",
        "reviewed" => "Thanks for your review!",
        "empty_review" => "Reviews cannot be empty.",
        "enrolled" => "You are enrolled. Enjoy the course!",
        "not_enrolled" => "Purchase this course to watch it.",
        "session" => "Your session could not be saved. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
    .to_owned()
}

/// Format an amount in the shop currency.
#[must_use]
pub fn money(amount: Decimal, currency: CurrencyCode) -> String {
    Price::new(amount, currency).display()
}

// =============================================================================
// Routers
// =============================================================================

/// Auth routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/forgot", get(auth::forgot_page).post(auth::forgot))
        .route("/reset", get(auth::reset_page).post(auth::reset))
}

/// JSON API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/session/check", post(api::session::check))
}

/// Product routes.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/rate", post(products::rate))
        .route("/{id}/reviews", post(products::review))
}

/// Cart routes.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/{product_id}/increment", post(cart::increment))
        .route("/{product_id}/decrement", post(cart::decrement))
        .route("/{product_id}/remove", post(cart::remove))
}

/// Checkout routes.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::shipping_page).post(checkout::start_payment))
        .route("/confirm", post(checkout::confirm))
}

/// Course routes.
pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(courses::index))
        .route("/{id}", get(courses::show))
        .route("/{id}/enroll", post(courses::enroll))
        .route("/{id}/watch", get(courses::watch))
}

/// Account routes.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/orders", get(account::orders))
}

fn site_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route("/orders/{id}", get(checkout::order_confirmation))
        .nest("/courses", course_routes())
        .nest("/account", account_routes())
}

/// All storefront routes, without rate limiting.
pub fn routes() -> Router<AppState> {
    site_routes()
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
}

/// All storefront routes with per-IP rate limits on auth and API.
///
/// Needs the client address: serve with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn rate_limited_routes() -> Router<AppState> {
    site_routes()
        .nest("/auth", auth_routes().layer(auth_rate_limiter()))
        .nest("/api", api_routes().layer(api_rate_limiter()))
}
