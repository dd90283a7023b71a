//! Authentication extractors and device-session helpers.
//!
//! The signed-in user and the device's session token both live in the
//! tower-sessions record behind the session cookie. Handlers see the user
//! through [`RequireAuth`] / [`OptionalAuth`]; nothing else holds auth state.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use knotwork_core::session::SessionToken;

use crate::models::{CurrentUser, session_keys};

/// Where unauthenticated page requests are sent.
pub const LOGIN_PATH: &str = "/auth/login";

/// Extractor that requires a signed-in user.
///
/// Page requests are redirected to the login page with a `next` parameter;
/// `/api/` requests get a bare 401.
pub struct RequireAuth(pub CurrentUser);

/// Rejection for [`RequireAuth`].
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin(String),
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(next) => Redirect::to(&format!(
                "{LOGIN_PATH}?next={}",
                urlencoding::encode(&next)
            ))
            .into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        current_user(session).await.map(Self).ok_or_else(|| {
            if parts.uri.path().starts_with("/api/") {
                AuthRejection::Unauthorized
            } else {
                AuthRejection::RedirectToLogin(parts.uri.path().to_owned())
            }
        })
    }
}

/// Extractor that optionally gets the signed-in user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };
        Ok(Self(user))
    }
}

async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Start a device session after sign-in.
///
/// Rotates the session id, then stores the user and the token minted for
/// this sign-in.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn begin_device_session(
    session: &Session,
    user: &CurrentUser,
    token: &SessionToken,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await?;
    session.insert(session_keys::SESSION_TOKEN, token).await
}

/// The token this device was given at sign-in.
pub async fn device_token(session: &Session) -> Option<SessionToken> {
    session
        .get::<SessionToken>(session_keys::SESSION_TOKEN)
        .await
        .ok()
        .flatten()
}

/// End the device session (sign out). Deletes the record and the cookie.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn end_device_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
