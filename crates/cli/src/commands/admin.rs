//! Operator role management.
//!
//! # Usage
//!
//! ```bash
//! # Let an existing account into the back office
//! kw-cli admin grant -e owner@example.com
//!
//! # Take it away again (effective on the operator's next request)
//! kw-cli admin revoke -e owner@example.com
//! ```
//!
//! The account must already exist; register it on the storefront first.

use thiserror::Error;

use knotwork_core::{Email, UserRole};
use knotwork_storefront::db::{RepositoryError, UserRepository};
use knotwork_storefront::store::DocumentStore;

use super::{ConnectError, connect_store};

/// Errors that can occur during role changes.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No account is registered under the email.
    #[error("No account found for {0}; register on the storefront first")]
    UnknownAccount(String),
}

/// Give the account registered under `email` the admin role.
///
/// # Errors
///
/// Returns `AdminError` if the email is invalid, unknown, or the write fails.
pub async fn grant(email: &str) -> Result<(), AdminError> {
    let store = connect_store().await?;
    set_role(&store, email, UserRole::Admin).await?;
    tracing::info!(email, "Admin role granted");
    Ok(())
}

/// Return the account registered under `email` to the customer role.
///
/// # Errors
///
/// Returns `AdminError` if the email is invalid, unknown, or the write fails.
pub async fn revoke(email: &str) -> Result<(), AdminError> {
    let store = connect_store().await?;
    set_role(&store, email, UserRole::Customer).await?;
    tracing::info!(email, "Admin role revoked");
    Ok(())
}

async fn set_role(store: &DocumentStore, email: &str, role: UserRole) -> Result<(), AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let users = UserRepository::new(store);

    let credential = users
        .get_credential(&email)
        .await?
        .ok_or_else(|| AdminError::UnknownAccount(email.to_string()))?;

    users.set_role(&credential.user_id, role).await?;
    Ok(())
}
