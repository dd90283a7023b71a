//! Database migrations.
//!
//! # Usage
//!
//! ```bash
//! kw-cli migrate
//! ```
//!
//! Creates the `documents` table and its change trigger, then the storefront
//! and back office session tables.

use tower_sessions_sqlx_store::PostgresStore;

use knotwork_admin::middleware::admin_session_store;

use super::{ConnectError, connect_pool};

/// Errors that can occur while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Session table creation failed.
    #[error("Session store error: {0}")]
    Sessions(String),
}

/// Run every migration.
///
/// # Errors
///
/// Returns `MigrationError` if any step fails; earlier steps stay applied.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect_pool().await?;

    tracing::info!("Running document store migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Creating storefront session table...");
    PostgresStore::new(pool.clone())
        .migrate()
        .await
        .map_err(|e| MigrationError::Sessions(e.to_string()))?;

    tracing::info!("Creating back office session table...");
    admin_session_store(pool)
        .map_err(MigrationError::Sessions)?
        .migrate()
        .await
        .map_err(|e| MigrationError::Sessions(e.to_string()))?;

    tracing::info!("Migrations complete");
    Ok(())
}
