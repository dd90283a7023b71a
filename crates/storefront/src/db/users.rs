//! User repository.
//!
//! Profiles (`users/{uid}`) hold what the rest of the app reads about an
//! account, including the active session token. Credentials are keyed by
//! normalized email so registration can claim an address atomically.

use chrono::{DateTime, Utc};
use serde_json::json;

use knotwork_core::{Email, UserId, UserRole};

use super::{RepositoryError, collections, fields};
use crate::models::{Credential, PasswordReset, UserProfile};
use crate::store::{Direction, DocumentStore, Query, StoreError};

/// Repository for profiles, credentials and reset tokens.
pub struct UserRepository<'a> {
    store: &'a DocumentStore,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Get a profile by user id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or the document is malformed.
    pub async fn get_profile(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.store.get_as(collections::USERS, id.as_str()).await?)
    }

    /// Store a new profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id is taken.
    pub async fn create_profile(&self, profile: &UserProfile) -> Result<(), RepositoryError> {
        let data = serde_json::to_value(profile).map_err(StoreError::from)?;
        if self
            .store
            .create(collections::USERS, profile.id.as_str(), data)
            .await?
        {
            Ok(())
        } else {
            Err(RepositoryError::Conflict(format!(
                "profile {} already exists",
                profile.id
            )))
        }
    }

    /// Record the token of the newest sign-in, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    pub async fn set_active_session_token(
        &self,
        id: &UserId,
        token: &str,
    ) -> Result<(), RepositoryError> {
        let update = fields([("activeSessionToken", json!(token))]);
        Ok(self.store.update(collections::USERS, id.as_str(), update).await?)
    }

    /// Change an account's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    pub async fn set_role(&self, id: &UserId, role: UserRole) -> Result<(), RepositoryError> {
        let update = fields([("role", json!(role))]);
        Ok(self.store.update(collections::USERS, id.as_str(), update).await?)
    }

    /// Every profile, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or a document is malformed.
    pub async fn list_profiles(&self) -> Result<Vec<UserProfile>, RepositoryError> {
        let query = Query::collection(collections::USERS).order_by("createdAt", Direction::Descending);
        Ok(self.store.query_as(&query).await?)
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    /// Credential for an email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or the document is malformed.
    pub async fn get_credential(&self, email: &Email) -> Result<Option<Credential>, RepositoryError> {
        Ok(self
            .store
            .get_as(collections::CREDENTIALS, email.as_str())
            .await?)
    }

    /// Claim an email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    pub async fn create_credential(&self, credential: &Credential) -> Result<(), RepositoryError> {
        let data = serde_json::to_value(credential).map_err(StoreError::from)?;
        if self
            .store
            .create(collections::CREDENTIALS, credential.email.as_str(), data)
            .await?
        {
            Ok(())
        } else {
            Err(RepositoryError::Conflict(format!(
                "email {} already registered",
                credential.email
            )))
        }
    }

    /// Replace the password hash for an email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no credential exists.
    pub async fn set_password_hash(&self, email: &Email, hash: &str) -> Result<(), RepositoryError> {
        let update = fields([("passwordHash", json!(hash))]);
        Ok(self
            .store
            .update(collections::CREDENTIALS, email.as_str(), update)
            .await?)
    }

    /// Link a federated identity to an existing credential.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no credential exists.
    pub async fn link_provider(
        &self,
        email: &Email,
        provider: &str,
        subject: &str,
    ) -> Result<(), RepositoryError> {
        let update = fields([
            ("provider", json!(provider)),
            ("providerSubject", json!(subject)),
        ]);
        Ok(self
            .store
            .update(collections::CREDENTIALS, email.as_str(), update)
            .await?)
    }

    /// Credential linked to a federated identity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or the document is malformed.
    pub async fn find_by_provider(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<Credential>, RepositoryError> {
        let query = Query::collection(collections::CREDENTIALS)
            .where_eq("provider", provider)
            .where_eq("providerSubject", subject)
            .limit(1);
        let mut found: Vec<Credential> = self.store.query_as(&query).await?;
        Ok(found.pop())
    }

    // =========================================================================
    // Password resets
    // =========================================================================

    /// Store a reset token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn create_password_reset(&self, reset: &PasswordReset) -> Result<(), RepositoryError> {
        Ok(self
            .store
            .set_as(collections::PASSWORD_RESETS, &reset.id, reset)
            .await?)
    }

    /// Consume a reset token. Returns it only if it existed and had not
    /// expired at `now`; the token is deleted either way.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or the document is malformed.
    pub async fn take_password_reset(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PasswordReset>, RepositoryError> {
        let Some(reset) = self
            .store
            .get_as::<PasswordReset>(collections::PASSWORD_RESETS, token)
            .await?
        else {
            return Ok(None);
        };
        // Another request may have consumed it first.
        if !self.store.delete(collections::PASSWORD_RESETS, token).await? {
            return Ok(None);
        }
        Ok(reset.is_valid_at(now).then_some(reset))
    }
}
