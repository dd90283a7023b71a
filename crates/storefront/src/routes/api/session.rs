//! Single-active-session check for the course player.
//!
//! `static/js/player.js` posts here once when the player mounts and again
//! whenever the tab regains focus. A superseded device is signed out here,
//! and the reply tells the page to show the notice and leave.

use axum::{Json, extract::State};
use tower_sessions::Session;
use tracing::instrument;

use crate::db::UserRepository;
use crate::error::clear_sentry_user;
use crate::middleware::{RequireAuth, device_token, end_device_session};
use crate::services::session_guard::{SessionCheckRequest, SessionCheckResponse, SessionGuard};
use crate::state::AppState;

/// Run the check for this device.
///
/// Never fails once the user is known: an unreadable profile lets playback
/// continue, and a failed sign-out is logged while the page is still told to
/// leave.
#[instrument(skip(state, session, user, request), fields(user_id = %user.id, trigger = ?request.trigger))]
pub async fn check(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(request): Json<SessionCheckRequest>,
) -> Json<SessionCheckResponse> {
    let token = device_token(&session).await;
    let verdict = SessionGuard::new(UserRepository::new(state.store()))
        .check(&user.id, token.as_ref(), request.visibility)
        .await;

    if !verdict.requires_sign_out() {
        return Json(SessionCheckResponse::proceed());
    }

    tracing::info!("Device superseded by a newer sign-in; signing out");
    if let Err(e) = end_device_session(&session).await {
        tracing::error!(error = %e, "Failed to clear superseded session");
    }
    clear_sentry_user();
    Json(SessionCheckResponse::signed_out())
}
