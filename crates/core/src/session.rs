//! Single-active-session decision rule for course playback.
//!
//! Every sign-in mints a fresh [`SessionToken`]. The signing-in device keeps
//! its copy and the account profile records the same value as its
//! `activeSessionToken`, overwriting whatever an earlier sign-in left there.
//! A playback page then compares the two whenever it mounts or comes back to
//! the foreground. This module holds the comparison; fetching the profile and
//! signing out live in the storefront.
//!
//! This is a deterrent against shared logins. It runs only when the page asks
//! for it, so a device that never asks is never stopped.

use serde::{Deserialize, Serialize};

/// Opaque per-sign-in marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap an already-generated token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Document visibility reported by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// What made the page ask for a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckTrigger {
    /// The playback page finished loading and the viewer is known.
    Mount,
    /// The tab or window regained the foreground.
    Focus,
}

/// Why a check took no action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inconclusive {
    /// The page is in the background; a sign-out now would surprise the viewer.
    Hidden,
    /// The profile has no active token recorded (or it is empty).
    NoProfileToken,
    /// The account has no profile record.
    ProfileMissing,
    /// The profile could not be read; playback is allowed to continue.
    ProfileUnavailable,
}

/// Outcome of comparing the device token with the profile token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verdict", content = "reason")]
pub enum SessionVerdict {
    /// Tokens match; this device holds the newest sign-in.
    Current,
    /// Another device signed in more recently; this session must end.
    Superseded,
    /// Not enough to act on; playback continues.
    Inconclusive(Inconclusive),
}

impl SessionVerdict {
    /// Whether the caller must sign this device out.
    #[must_use]
    pub const fn requires_sign_out(self) -> bool {
        matches!(self, Self::Superseded)
    }
}

/// Compare the profile's active token with this device's token.
///
/// Superseded only when the profile token is present and non-empty, differs
/// from the device token by exact string comparison, and the page is
/// visible. A device with no token of its own against a recorded profile
/// token counts as different.
#[must_use]
pub fn evaluate(
    profile_token: Option<&str>,
    device_token: Option<&str>,
    visibility: Visibility,
) -> SessionVerdict {
    let Some(profile_token) = profile_token.filter(|t| !t.is_empty()) else {
        return SessionVerdict::Inconclusive(Inconclusive::NoProfileToken);
    };

    if device_token == Some(profile_token) {
        return SessionVerdict::Current;
    }

    match visibility {
        Visibility::Visible => SessionVerdict::Superseded,
        Visibility::Hidden => SessionVerdict::Inconclusive(Inconclusive::Hidden),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_tokens_are_current() {
        assert_eq!(
            evaluate(Some("t1"), Some("t1"), Visibility::Visible),
            SessionVerdict::Current
        );
        assert_eq!(
            evaluate(Some("t1"), Some("t1"), Visibility::Hidden),
            SessionVerdict::Current
        );
    }

    #[test]
    fn test_mismatch_while_visible_is_superseded() {
        let verdict = evaluate(Some("t2"), Some("t1"), Visibility::Visible);
        assert_eq!(verdict, SessionVerdict::Superseded);
        assert!(verdict.requires_sign_out());
    }

    #[test]
    fn test_mismatch_while_hidden_waits() {
        assert_eq!(
            evaluate(Some("t2"), Some("t1"), Visibility::Hidden),
            SessionVerdict::Inconclusive(Inconclusive::Hidden)
        );
        // Same state once the page is visible again.
        assert_eq!(
            evaluate(Some("t2"), Some("t1"), Visibility::Visible),
            SessionVerdict::Superseded
        );
    }

    #[test]
    fn test_missing_or_empty_profile_token_is_inconclusive() {
        for profile in [None, Some("")] {
            assert_eq!(
                evaluate(profile, Some("t1"), Visibility::Visible),
                SessionVerdict::Inconclusive(Inconclusive::NoProfileToken)
            );
        }
    }

    #[test]
    fn test_device_without_token_is_superseded() {
        assert_eq!(
            evaluate(Some("t1"), None, Visibility::Visible),
            SessionVerdict::Superseded
        );
    }

    #[test]
    fn test_comparison_is_exact() {
        assert_eq!(
            evaluate(Some("Token"), Some("token"), Visibility::Visible),
            SessionVerdict::Superseded
        );
        assert_eq!(
            evaluate(Some("t1 "), Some("t1"), Visibility::Visible),
            SessionVerdict::Superseded
        );
    }

    #[test]
    fn test_verdict_serializes_with_reason() {
        let json = serde_json::to_value(SessionVerdict::Inconclusive(Inconclusive::Hidden)).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({"verdict": "inconclusive", "reason": "hidden"}))
        );
    }
}
