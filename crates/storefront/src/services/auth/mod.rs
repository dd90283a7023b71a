//! Authentication service.
//!
//! Email/password accounts with argon2 hashes, federated sign-in from an
//! already-verified provider identity, and emailed password resets.
//!
//! Every successful sign-in starts a new device session: a fresh
//! [`SessionToken`] is minted, written to the profile as
//! `activeSessionToken` (replacing whatever was there) and handed back for
//! the caller to keep in the device's session.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use rand::RngCore;
use tracing::instrument;

use knotwork_core::session::SessionToken;
use knotwork_core::{Email, UserId, UserRole};

use crate::db::{RepositoryError, UserRepository};
use crate::models::{Credential, PasswordReset, UserProfile};
use crate::services::email::EmailService;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Minutes a reset link stays valid.
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Random bytes in session and reset tokens.
const TOKEN_BYTES: usize = 32;

/// A successful sign-in.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub profile: UserProfile,
    /// The token this device must keep.
    pub token: SessionToken,
}

/// An identity already verified by an external provider.
#[derive(Debug, Clone)]
pub struct FederatedIdentity {
    /// Provider name, e.g. `google`.
    pub provider: String,
    /// Stable subject id at the provider.
    pub subject: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    mailer: Option<&'a EmailService>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: UserRepository<'a>) -> Self {
        Self {
            users,
            mailer: None,
        }
    }

    /// Send reset links through `mailer` instead of logging them.
    #[must_use]
    pub const fn with_mailer(mut self, mailer: Option<&'a EmailService>) -> Self {
        self.mailer = mailer;
        self
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignedIn, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user_id = UserId::generate();
        self.users
            .create_credential(&Credential {
                email: email.clone(),
                user_id: user_id.clone(),
                password_hash: Some(password_hash),
                provider: None,
                provider_subject: None,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        let profile = new_profile(user_id, email, display_name);
        self.users.create_profile(&profile).await?;
        tracing::info!(user_id = %profile.id, "Account created");

        self.begin_session(profile).await
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthError> {
        let profile = self.verify_credentials(email, password).await?;
        self.begin_session(profile).await
    }

    /// Check email and password without starting a device session.
    ///
    /// The back office signs operators in with this so that opening it does
    /// not end course playback elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let credential = self
            .users
            .get_credential(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let hash = credential
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, hash)?;

        self.users
            .get_profile(&credential.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Sign in with a provider-verified identity, creating the account on
    /// first use and linking it to an existing email account otherwise.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IncompleteIdentity` if provider or subject is blank.
    /// Returns `AuthError::InvalidEmail` if the provider's email is malformed.
    #[instrument(skip(self, identity), fields(provider = %identity.provider))]
    pub async fn sign_in_with_identity(
        &self,
        identity: FederatedIdentity,
    ) -> Result<SignedIn, AuthError> {
        if identity.provider.trim().is_empty() {
            return Err(AuthError::IncompleteIdentity("provider"));
        }
        if identity.subject.trim().is_empty() {
            return Err(AuthError::IncompleteIdentity("subject"));
        }

        let user_id = if let Some(linked) = self
            .users
            .find_by_provider(&identity.provider, &identity.subject)
            .await?
        {
            linked.user_id
        } else {
            let email = Email::parse(&identity.email)?;
            if let Some(existing) = self.users.get_credential(&email).await? {
                self.users
                    .link_provider(&email, &identity.provider, &identity.subject)
                    .await?;
                existing.user_id
            } else {
                let user_id = UserId::generate();
                self.users
                    .create_credential(&Credential {
                        email: email.clone(),
                        user_id: user_id.clone(),
                        password_hash: None,
                        provider: Some(identity.provider.clone()),
                        provider_subject: Some(identity.subject.clone()),
                    })
                    .await?;
                let name = identity.display_name.as_deref().unwrap_or_default();
                self.users
                    .create_profile(&new_profile(user_id.clone(), email, name))
                    .await?;
                tracing::info!(user_id = %user_id, "Account created from federated identity");
                user_id
            }
        };

        let profile = self
            .users
            .get_profile(&user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.begin_session(profile).await
    }

    /// Mint a token and make it the profile's active session.
    async fn begin_session(&self, mut profile: UserProfile) -> Result<SignedIn, AuthError> {
        let token = SessionToken::new(generate_token());
        self.users
            .set_active_session_token(&profile.id, token.as_str())
            .await?;
        profile.active_session_token = Some(token.as_str().to_owned());
        tracing::info!(user_id = %profile.id, "Signed in");
        Ok(SignedIn { profile, token })
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Issue a reset link for `email` if an account exists.
    ///
    /// Unknown addresses succeed silently so the form does not reveal which
    /// emails are registered. Without a mailer the link is logged.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store fails.
    #[instrument(skip(self, base_url))]
    pub async fn send_password_reset(&self, email: &str, base_url: &str) -> Result<(), AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(());
        };
        let Some(credential) = self.users.get_credential(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let reset = PasswordReset {
            id: generate_token(),
            user_id: credential.user_id,
            expires_at: Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        };
        self.users.create_password_reset(&reset).await?;

        let link = format!(
            "{}/auth/reset?token={}",
            base_url.trim_end_matches('/'),
            reset.id
        );
        match self.mailer {
            Some(mailer) => {
                if let Err(e) = mailer.send_password_reset(email.as_str(), &link).await {
                    tracing::error!(error = %e, "Failed to send password reset email");
                }
            }
            None => tracing::debug!(link = %link, "Email not configured; password reset link"),
        }
        Ok(())
    }

    /// Set a new password using a reset token. The token is consumed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` if the token is unknown, used or expired.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;
        if !is_token_shaped(token) {
            return Err(AuthError::InvalidResetToken);
        }

        let reset = self
            .users
            .take_password_reset(token, Utc::now())
            .await?
            .ok_or(AuthError::InvalidResetToken)?;
        let profile = self
            .users
            .get_profile(&reset.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let hash = hash_password(new_password)?;
        self.users
            .set_password_hash(&profile.email, &hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;
        tracing::info!(user_id = %profile.id, "Password reset");
        Ok(())
    }

    /// Get a user's profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the profile doesn't exist.
    pub async fn get_profile(&self, user_id: &UserId) -> Result<UserProfile, AuthError> {
        self.users
            .get_profile(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

fn new_profile(id: UserId, email: Email, display_name: &str) -> UserProfile {
    UserProfile {
        id,
        email,
        display_name: display_name.trim().to_owned(),
        role: UserRole::Customer,
        active_session_token: None,
        created_at: Utc::now(),
    }
}

/// Random URL-safe token.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Whether `token` could have come from [`generate_token`].
fn is_token_shaped(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= 64
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::DocumentStore;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse!", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_generated_tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(is_token_shaped(&a));
        assert!(!is_token_shaped("../etc/passwd"));
    }

    #[tokio::test]
    async fn test_each_sign_in_replaces_active_token() {
        let store = DocumentStore::memory();
        let auth = AuthService::new(UserRepository::new(&store));

        let first = auth.sign_up("knitter@example.com", "purl-two-together", "Asha").await.unwrap();
        let second = auth.sign_in("Knitter@Example.com", "purl-two-together").await.unwrap();
        assert_ne!(first.token, second.token);

        let profile = auth.get_profile(&first.profile.id).await.unwrap();
        assert_eq!(profile.active_session_token.as_deref(), Some(second.token.as_str()));
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_rejected() {
        let store = DocumentStore::memory();
        let auth = AuthService::new(UserRepository::new(&store));
        auth.sign_up("knitter@example.com", "purl-two-together", "").await.unwrap();
        let again = auth.sign_up("knitter@example.com", "another-password", "").await;
        assert!(matches!(again, Err(AuthError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let store = DocumentStore::memory();
        let auth = AuthService::new(UserRepository::new(&store));
        auth.sign_up("knitter@example.com", "purl-two-together", "").await.unwrap();
        let result = auth.sign_in("knitter@example.com", "knit-one").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        let result = auth.sign_in("nobody@example.com", "purl-two-together").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_federated_identity_links_existing_account() {
        let store = DocumentStore::memory();
        let auth = AuthService::new(UserRepository::new(&store));
        let local = auth.sign_up("knitter@example.com", "purl-two-together", "").await.unwrap();

        let identity = FederatedIdentity {
            provider: "google".to_string(),
            subject: "1234567890".to_string(),
            email: "knitter@example.com".to_string(),
            display_name: Some("Asha".to_string()),
        };
        let federated = auth.sign_in_with_identity(identity.clone()).await.unwrap();
        assert_eq!(federated.profile.id, local.profile.id);

        let again = auth.sign_in_with_identity(identity).await.unwrap();
        assert_eq!(again.profile.id, local.profile.id);
        assert_ne!(again.token, federated.token);
    }

    #[tokio::test]
    async fn test_reset_token_is_single_use() {
        let store = DocumentStore::memory();
        let users = UserRepository::new(&store);
        let auth = AuthService::new(UserRepository::new(&store));
        let signed_in = auth.sign_up("knitter@example.com", "purl-two-together", "").await.unwrap();

        let reset = PasswordReset {
            id: generate_token(),
            user_id: signed_in.profile.id.clone(),
            expires_at: Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        };
        users.create_password_reset(&reset).await.unwrap();

        auth.reset_password(&reset.id, "cast-on-again").await.unwrap();
        assert!(auth.sign_in("knitter@example.com", "cast-on-again").await.is_ok());
        assert!(matches!(
            auth.reset_password(&reset.id, "cast-on-thrice").await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[tokio::test]
    async fn test_expired_reset_token_rejected() {
        let store = DocumentStore::memory();
        let users = UserRepository::new(&store);
        let auth = AuthService::new(UserRepository::new(&store));
        let signed_in = auth.sign_up("knitter@example.com", "purl-two-together", "").await.unwrap();

        let reset = PasswordReset {
            id: generate_token(),
            user_id: signed_in.profile.id,
            expires_at: Utc::now() - Duration::minutes(1),
        };
        users.create_password_reset(&reset).await.unwrap();
        assert!(matches!(
            auth.reset_password(&reset.id, "cast-on-again").await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    /// Formatted log output collected in memory.
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    async fn reset_log_at(level: tracing::Level) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let store = DocumentStore::memory();
        let auth = AuthService::new(UserRepository::new(&store));
        auth.sign_up("knitter@example.com", "purl-two-together", "").await.unwrap();
        auth.send_password_reset("knitter@example.com", "https://knotwork.test")
            .await
            .unwrap();

        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_reset_link_stays_out_of_info_logs() {
        let info = reset_log_at(tracing::Level::INFO).await;
        assert!(info.contains("Account created"));
        assert!(!info.contains("/auth/reset?token="));

        let debug = reset_log_at(tracing::Level::DEBUG).await;
        assert!(debug.contains("https://knotwork.test/auth/reset?token="));
    }
}
