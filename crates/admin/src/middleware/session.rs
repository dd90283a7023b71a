//! Session layer for admin.
//!
//! Sessions live apart from the storefront's (`admin.session` in
//! `PostgreSQL`) with a stricter cookie: `SameSite=Strict` and 24 hour expiry.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

/// Session cookie name for admin.
pub const SESSION_COOKIE_NAME: &str = "kw_admin_session";

/// Schema and table holding back office sessions.
pub const SESSION_SCHEMA: &str = "admin";
pub const SESSION_TABLE: &str = "session";

/// Session expiry time in seconds (24 hours).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Create the session layer over `store`.
///
/// Cookies are marked `Secure` when `base_url` is HTTPS.
pub fn create_session_layer<S>(store: S, base_url: &str) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(base_url.starts_with("https://"))
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}

/// The `PostgreSQL` session store for back office sessions.
///
/// # Errors
///
/// Returns the store's message if the schema or table name is rejected.
pub fn admin_session_store(pool: PgPool) -> Result<PostgresStore, String> {
    PostgresStore::new(pool)
        .with_schema_name(SESSION_SCHEMA)?
        .with_table_name(SESSION_TABLE)
}
