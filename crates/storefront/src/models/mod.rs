//! Domain models for the storefront.
//!
//! Field names follow the stored document shape (camelCase). Timestamps are
//! stored as epoch milliseconds so they sort the same in every backend.

pub mod cart;
pub mod catalog;
pub mod enrollment;
pub mod order;
pub mod rating;
pub mod session;
pub mod user;

pub use cart::CartItem;
pub use catalog::{Course, CourseVideo, Product};
pub use enrollment::Enrollment;
pub use order::{Order, OrderItem, PaymentInfo, ShippingInfo};
pub use rating::{RatingRecord, Review};
pub use session::{CurrentUser, PendingCheckout, keys as session_keys};
pub use user::{Credential, PasswordReset, UserProfile};
