//! Repositories over the document store.
//!
//! # Collections
//!
//! - `products` - Shop catalog, with the running rating aggregate
//! - `courses` - Video courses and their lessons
//! - `orders` - Placed orders
//! - `enrollments` - Course access, keyed `{userId}_{courseId}`
//! - `ratings` - One rating per user per product, keyed `{userId}_{productId}`
//! - `reviews` - Written product reviews
//! - `carts/{userId}/items` - Cart rows, keyed by product id
//! - `users` - Profiles, including the active session token
//! - `credentials` - Password hashes and federated identities, keyed by email
//! - `passwordResets` - Single-use reset tokens
//!
//! # Migrations
//!
//! The `PostgreSQL` backend's tables live in `crates/storefront/migrations/`
//! and run via:
//! ```bash
//! cargo run -p knotwork-cli -- migrate
//! ```

pub mod carts;
pub mod courses;
pub mod enrollments;
pub mod orders;
pub mod products;
pub mod ratings;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::store::StoreError;

pub use carts::CartRepository;
pub use courses::CourseRepository;
pub use enrollments::EnrollmentRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use ratings::{RatingRepository, ReviewRepository};
pub use users::UserRepository;

/// Collection names.
pub mod collections {
    use knotwork_core::UserId;

    pub const PRODUCTS: &str = "products";
    pub const COURSES: &str = "courses";
    pub const ORDERS: &str = "orders";
    pub const ENROLLMENTS: &str = "enrollments";
    pub const RATINGS: &str = "ratings";
    pub const REVIEWS: &str = "reviews";
    pub const USERS: &str = "users";
    pub const CREDENTIALS: &str = "credentials";
    pub const PASSWORD_RESETS: &str = "passwordResets";

    /// A user's cart rows.
    #[must_use]
    pub fn cart_items(user_id: &UserId) -> String {
        format!("carts/{user_id}/items")
    }
}

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Document store error.
    #[error("store error: {0}")]
    Store(StoreError),

    /// Stored data does not match the model.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., email already registered).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization(e) => Self::DataCorruption(e.to_string()),
            StoreError::NotFound { .. } => Self::NotFound,
            other => Self::Store(other),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Build a top-level field map for `DocumentStore::update`.
pub(crate) fn fields<const N: usize>(
    pairs: [(&str, serde_json::Value); N],
) -> serde_json::Map<String, serde_json::Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect()
}
