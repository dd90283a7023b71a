//! HTTP middleware for admin.

pub mod auth;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAdminAuth, RequireAdminAuth, clear_current_admin, set_current_admin};
pub use security_headers::security_headers_middleware;
pub use session::{admin_session_store, create_session_layer};
