//! Playback session guard.
//!
//! Runs the single-active-session check for a course player page: read the
//! profile's active token and compare it with the token this device was
//! given at sign-in. The rule itself lives in
//! [`knotwork_core::session::evaluate`]; this service supplies the profile
//! read and its failure handling.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use knotwork_core::UserId;
use knotwork_core::session::{CheckTrigger, Inconclusive, SessionToken, SessionVerdict, Visibility, evaluate};

use crate::db::UserRepository;

/// Notice shown when this device has been superseded.
pub const SUPERSEDED_MESSAGE: &str =
    "You have been signed out because your account was signed in on another device.";

/// Where a superseded device is sent.
pub const SUPERSEDED_REDIRECT: &str = "/";

/// Body posted by the player page.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SessionCheckRequest {
    pub trigger: CheckTrigger,
    pub visibility: Visibility,
}

/// What the page must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckAction {
    /// Keep playing.
    Continue,
    /// The device has been signed out; show the message and navigate away.
    SignOut,
}

/// Reply to the player page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionCheckResponse {
    pub action: CheckAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
}

impl SessionCheckResponse {
    /// No action.
    #[must_use]
    pub const fn proceed() -> Self {
        Self {
            action: CheckAction::Continue,
            message: None,
            redirect: None,
        }
    }

    /// The device was signed out.
    #[must_use]
    pub const fn signed_out() -> Self {
        Self {
            action: CheckAction::SignOut,
            message: Some(SUPERSEDED_MESSAGE),
            redirect: Some(SUPERSEDED_REDIRECT),
        }
    }
}

/// Session guard for course playback.
pub struct SessionGuard<'a> {
    users: UserRepository<'a>,
}

impl<'a> SessionGuard<'a> {
    /// Create a new session guard.
    #[must_use]
    pub const fn new(users: UserRepository<'a>) -> Self {
        Self { users }
    }

    /// Decide whether this device still holds the account's newest sign-in.
    ///
    /// Never fails: a profile that cannot be read is logged and treated as
    /// inconclusive so playback continues.
    #[instrument(skip(self, device_token), fields(user_id = %user_id))]
    pub async fn check(
        &self,
        user_id: &UserId,
        device_token: Option<&SessionToken>,
        visibility: Visibility,
    ) -> SessionVerdict {
        let verdict = match self.users.get_profile(user_id).await {
            Ok(Some(profile)) => evaluate(
                profile.active_session_token.as_deref(),
                device_token.map(SessionToken::as_str),
                visibility,
            ),
            Ok(None) => SessionVerdict::Inconclusive(Inconclusive::ProfileMissing),
            Err(e) => {
                tracing::warn!(error = %e, "Profile read failed during session check");
                SessionVerdict::Inconclusive(Inconclusive::ProfileUnavailable)
            }
        };
        tracing::debug!(?verdict, "Session check");
        verdict
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use knotwork_core::{Email, UserRole};

    use super::*;
    use crate::models::UserProfile;
    use crate::store::DocumentStore;

    async fn seed(store: &DocumentStore, token: Option<&str>) -> UserId {
        let users = UserRepository::new(store);
        let profile = UserProfile {
            id: UserId::new("u1"),
            email: Email::parse("viewer@example.com").unwrap(),
            display_name: String::new(),
            role: UserRole::Customer,
            active_session_token: token.map(str::to_owned),
            created_at: Utc::now(),
        };
        users.create_profile(&profile).await.unwrap();
        profile.id
    }

    #[tokio::test]
    async fn test_matching_token_continues() {
        let store = DocumentStore::memory();
        let user = seed(&store, Some("t1")).await;
        let guard = SessionGuard::new(UserRepository::new(&store));
        let verdict = guard
            .check(&user, Some(&SessionToken::new("t1")), Visibility::Visible)
            .await;
        assert_eq!(verdict, SessionVerdict::Current);
    }

    #[tokio::test]
    async fn test_newer_sign_in_supersedes() {
        let store = DocumentStore::memory();
        let user = seed(&store, Some("t2")).await;
        let guard = SessionGuard::new(UserRepository::new(&store));
        let verdict = guard
            .check(&user, Some(&SessionToken::new("t1")), Visibility::Visible)
            .await;
        assert!(verdict.requires_sign_out());
    }

    #[tokio::test]
    async fn test_missing_profile_is_inconclusive() {
        let store = DocumentStore::memory();
        let guard = SessionGuard::new(UserRepository::new(&store));
        let verdict = guard
            .check(&UserId::new("ghost"), Some(&SessionToken::new("t1")), Visibility::Visible)
            .await;
        assert_eq!(verdict, SessionVerdict::Inconclusive(Inconclusive::ProfileMissing));
    }

    #[tokio::test]
    async fn test_unreadable_profile_fails_open() {
        let store = DocumentStore::memory();
        store
            .set("users", "u1", serde_json::json!({"email": 42}))
            .await
            .unwrap();
        let guard = SessionGuard::new(UserRepository::new(&store));
        let verdict = guard
            .check(&UserId::new("u1"), Some(&SessionToken::new("t1")), Visibility::Visible)
            .await;
        assert_eq!(
            verdict,
            SessionVerdict::Inconclusive(Inconclusive::ProfileUnavailable)
        );
    }

    #[test]
    fn test_signed_out_response_shape() {
        let json = serde_json::to_value(SessionCheckResponse::signed_out()).unwrap();
        assert_eq!(json["action"], "sign_out");
        assert_eq!(json["redirect"], "/");
        let json = serde_json::to_value(SessionCheckResponse::proceed()).unwrap();
        assert_eq!(json, serde_json::json!({"action": "continue"}));
    }
}
