//! Account records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use knotwork_core::{Email, UserId, UserRole};

/// Public profile of an account, stored at `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub role: UserRole,
    /// Token of the most recent sign-in. Only that device may keep playing
    /// courses.
    #[serde(default)]
    pub active_session_token: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Name to greet the user with.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            self.email.local_part()
        } else {
            &self.display_name
        }
    }
}

/// How an account proves its identity, stored at `credentials/{email}`.
///
/// Kept apart from the profile so profile reads never carry a hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Normalized email; also the document id.
    pub email: Email,
    pub user_id: UserId,
    /// Argon2 PHC string; absent for federated-only accounts.
    #[serde(default)]
    pub password_hash: Option<String>,
    /// Federated identity provider name, e.g. `google`.
    #[serde(default)]
    pub provider: Option<String>,
    /// Subject id at the provider.
    #[serde(default)]
    pub provider_subject: Option<String>,
}

/// Single-use password reset token, stored at `passwordResets/{token}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub id: String,
    pub user_id: UserId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl PasswordReset {
    /// Whether the token is still usable at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
