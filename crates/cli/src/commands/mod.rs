//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

use knotwork_storefront::db;
use knotwork_storefront::store::{DocumentStore, PgDocumentStore, StoreError};

/// Errors shared by commands that talk to the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Document store error: {0}")]
    Store(#[from] StoreError),
}

/// Connect to the database named by `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConnectError` if the variable is missing or the pool fails.
pub async fn connect_pool() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}

/// Open the document store over `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConnectError` if the pool or change listener cannot start.
pub async fn connect_store() -> Result<DocumentStore, ConnectError> {
    let pool = connect_pool().await?;
    Ok(DocumentStore::Postgres(PgDocumentStore::connect(pool).await?))
}
