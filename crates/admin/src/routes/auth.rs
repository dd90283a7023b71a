//! Back office sign-in.
//!
//! Operators use their storefront email and password. Verifying here does not
//! mint a playback token, so opening the back office never ends a course
//! session on another device.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use knotwork_core::UserRole;
use knotwork_storefront::db::UserRepository;
use knotwork_storefront::services::auth::{AuthError, AuthService};

use super::{AdminPage, MessageQuery};
use crate::error::Result;
use crate::filters;
use crate::middleware::{OptionalAdminAuth, clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub page: AdminPage,
}

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Display the login page, or go to the dashboard if already signed in.
#[instrument(skip(admin))]
pub async fn login_page(
    OptionalAdminAuth(admin): OptionalAdminAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    if admin.is_some() {
        return Redirect::to("/").into_response();
    }
    LoginTemplate {
        page: AdminPage::default().with_messages(&query),
    }
    .into_response()
}

/// Check credentials and the admin role.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    let auth = AuthService::new(UserRepository::new(state.store()));
    let profile = match auth.verify_credentials(&form.email, &form.password).await {
        Ok(profile) => profile,
        Err(AuthError::InvalidCredentials | AuthError::UserNotFound) => {
            return Ok(Redirect::to("/auth/login?error=credentials"));
        }
        Err(e) => return Err(e.into()),
    };

    if profile.role != UserRole::Admin {
        tracing::warn!(user_id = %profile.id, "Non-admin attempted back office login");
        return Ok(Redirect::to("/auth/login?error=not_admin"));
    }

    let admin = CurrentAdmin::from(&profile);
    set_current_admin(&session, &admin).await?;
    tracing::info!(user_id = %admin.id, "Operator signed in");

    Ok(Redirect::to("/"))
}

/// Sign out.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_admin(&session).await?;
    Ok(Redirect::to("/auth/login?success=signed_out"))
}
