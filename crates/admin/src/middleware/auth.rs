//! Authentication extractors for admin.
//!
//! Operators sign in with their storefront account; only profiles whose role
//! is `admin` are let in, and the role is checked again on every request.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use knotwork_core::UserRole;
use knotwork_storefront::db::UserRepository;

use crate::models::{CurrentAdmin, session_keys};
use crate::state::AppState;

/// Login page path.
pub const LOGIN_PATH: &str = "/auth/login";

/// Extractor that requires a signed-in admin.
///
/// Redirects HTML requests to the login page and answers API/event-stream
/// requests with 401.
pub struct RequireAdminAuth(pub CurrentAdmin);

/// Error returned when admin authentication is required.
pub enum AdminAuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Role check could not be completed.
    Unavailable,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdminAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let is_api = parts.uri.path().starts_with("/api/");
        let rejected = || {
            if is_api {
                AdminAuthRejection::Unauthorized
            } else {
                AdminAuthRejection::RedirectToLogin
            }
        };

        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AdminAuthRejection::Unauthorized)?;

        let admin: CurrentAdmin = session
            .get(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten()
            .ok_or_else(rejected)?;

        // A revoked role takes effect on the next request.
        let state = AppState::from_ref(state);
        let profile = UserRepository::new(state.store())
            .get_profile(&admin.id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to load operator profile");
                AdminAuthRejection::Unavailable
            })?;

        if !profile.is_some_and(|p| p.role == UserRole::Admin) {
            tracing::warn!(user_id = %admin.id, "Admin role revoked; ending back office session");
            let _ = clear_current_admin(session).await;
            return Err(rejected());
        }

        Ok(Self(admin))
    }
}

/// Extractor that optionally gets the current admin without any role check.
pub struct OptionalAdminAuth(pub Option<CurrentAdmin>);

impl<S> FromRequestParts<S> for OptionalAdminAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(admin))
    }
}

/// Store the signed-in operator in a fresh session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Forget the signed-in operator.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
