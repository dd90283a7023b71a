//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! # Dashboard
//! GET  /                        - Counts and recent orders
//!
//! # Auth (storefront accounts with the admin role)
//! GET  /auth/login              - Login page
//! POST /auth/login              - Verify credentials and role
//! POST /auth/logout             - Logout
//!
//! # Products
//! GET  /products                - Product listing
//! GET  /products/new            - New product form
//! POST /products                - Create (multipart, 1-5 images)
//! GET  /products/{id}/edit      - Edit form
//! POST /products/{id}           - Update (new images replace the old set)
//! POST /products/{id}/delete    - Delete
//!
//! # Orders
//! GET  /orders                  - Live order list
//! POST /orders/{id}/status      - Set status (free text, non-empty)
//! GET  /api/orders/stream       - Server-sent order snapshots
//!
//! # Courses
//! GET  /courses                 - Course listing
//! GET  /courses/new             - New course form
//! POST /courses                 - Create (one video URL per line)
//! GET  /courses/{id}/edit       - Edit form
//! POST /courses/{id}            - Update
//! POST /courses/{id}/delete     - Delete
//!
//! # Enrollments
//! GET  /enrollments             - Every enrollment with user and course
//! ```

pub mod auth;
pub mod courses;
pub mod dashboard;
pub mod enrollments;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use knotwork_core::{CurrencyCode, Price};
use knotwork_storefront::models::catalog::MAX_PRODUCT_IMAGES;
use knotwork_storefront::services::image_host::MAX_IMAGE_BYTES;

use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Toast codes from the query string.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Fields every admin page needs.
#[derive(Debug, Clone, Default)]
pub struct AdminPage {
    pub admin: Option<CurrentAdmin>,
    /// Highlights the active navigation link.
    pub current_path: &'static str,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl AdminPage {
    /// Page context for a signed-in operator.
    #[must_use]
    pub fn new(admin: CurrentAdmin, current_path: &'static str) -> Self {
        Self {
            admin: Some(admin),
            current_path,
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
}

/// Text for a toast code.
#[must_use]
pub fn flash_text(code: &str) -> String {
    match code {
        "credentials" => "Invalid email or password.",
        "not_admin" => "This account does not have back office access.",
        "signed_out" => "You have been signed out.",
        "product_saved" => "Product saved.",
        "product_deleted" => "Product deleted.",
        "course_saved" => "Course saved.",
        "course_deleted" => "Course deleted.",
        "status_updated" => "Order status updated.",
        "status_required" => "Enter a status before saving.",
        "not_found" => "That record no longer exists.",
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

/// Parse a positive price typed into a form.
#[must_use]
pub fn parse_price(raw: &str) -> Option<Decimal> {
    raw.trim()
        .parse::<Decimal>()
        .ok()
        .filter(|price| *price > Decimal::ZERO)
}

/// Largest product form body: five images plus the text fields.
const PRODUCT_FORM_LIMIT: usize = MAX_PRODUCT_IMAGES * MAX_IMAGE_BYTES + 64 * 1024;

/// Build the admin router.
pub fn routes() -> Router<AppState> {
    let product_writes = Router::new()
        .route("/products", post(products::create))
        .route("/products/{id}", post(products::update))
        .layer(DefaultBodyLimit::max(PRODUCT_FORM_LIMIT));

    Router::new()
        .route("/", get(dashboard::index))
        .route("/auth/login", get(auth::login_page).post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/products", get(products::index))
        .route("/products/new", get(products::new_form))
        .route("/products/{id}/edit", get(products::edit_form))
        .route("/products/{id}/delete", post(products::delete))
        .route("/orders", get(orders::index))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/api/orders/stream", get(orders::stream))
        .route("/courses", get(courses::index).post(courses::create))
        .route("/courses/new", get(courses::new_form))
        .route("/courses/{id}", post(courses::update))
        .route("/courses/{id}/edit", get(courses::edit_form))
        .route("/courses/{id}/delete", post(courses::delete))
        .route("/enrollments", get(enrollments::index))
        .merge(product_writes)
}
