//! Authentication route handlers.
//!
//! Every successful sign-in (password or registration) starts a new device
//! session, which supersedes the account's other devices at their next
//! playback check.

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

use super::{MessageQuery, Page};
use crate::db::UserRepository;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth, begin_device_session, end_device_session};
use crate::models::CurrentUser;
use crate::services::auth::{AuthError, AuthService, SignedIn};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub display_name: String,
}

/// Forgot password form data.
#[derive(Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Deserialize)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

/// Login page query.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
    #[serde(flatten)]
    pub messages: MessageQuery,
}

/// Reset page query.
#[derive(Debug, Deserialize)]
pub struct ResetQuery {
    #[serde(default)]
    pub token: String,
    #[serde(flatten)]
    pub messages: MessageQuery,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: Page,
    pub next: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: Page,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub page: Page,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub page: Page,
    pub token: String,
}

// =============================================================================
// Helpers
// =============================================================================

/// Only same-site paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

/// Store the signed-in user and their token on this device.
async fn start_device_session(session: &Session, signed_in: &SignedIn) -> Result<()> {
    let user = CurrentUser::from(&signed_in.profile);
    begin_device_session(session, &user, &signed_in.token).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    nonce: CspNonce,
    Query(query): Query<LoginQuery>,
) -> LoginTemplate {
    LoginTemplate {
        next: safe_next(query.next.as_deref()).to_owned(),
        page: Page::new(user, &nonce).with_messages(&query.messages),
    }
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let auth = AuthService::new(UserRepository::new(state.store()));
    let signed_in = match auth.sign_in(&form.email, &form.password).await {
        Ok(signed_in) => signed_in,
        Err(AuthError::InvalidCredentials | AuthError::UserNotFound) => {
            tracing::info!("Login failed");
            let next = urlencoding::encode(safe_next(form.next.as_deref())).into_owned();
            return Ok(
                Redirect::to(&format!("/auth/login?error=credentials&next={next}")).into_response(),
            );
        }
        Err(e) => return Err(e.into()),
    };

    start_device_session(&session, &signed_in).await?;
    Ok(Redirect::to(safe_next(form.next.as_deref())).into_response())
}

/// Sign this device out.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Redirect> {
    end_device_session(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/?success=signed_out"))
}

// =============================================================================
// Registration
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    OptionalAuth(user): OptionalAuth,
    nonce: CspNonce,
    Query(query): Query<MessageQuery>,
) -> RegisterTemplate {
    RegisterTemplate {
        page: Page::new(user, &nonce).with_messages(&query),
    }
}

/// Create an account and sign it in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    if form.password != form.password_confirm {
        return Ok(Redirect::to("/auth/register?error=mismatch").into_response());
    }

    let auth = AuthService::new(UserRepository::new(state.store()));
    let signed_in = match auth
        .sign_up(&form.email, &form.password, &form.display_name)
        .await
    {
        Ok(signed_in) => signed_in,
        Err(e) => {
            let code = match e {
                AuthError::UserAlreadyExists => "exists",
                AuthError::WeakPassword(_) => "weak_password",
                AuthError::InvalidEmail(_) => "invalid_email",
                other => return Err(other.into()),
            };
            return Ok(Redirect::to(&format!("/auth/register?error={code}")).into_response());
        }
    };

    start_device_session(&session, &signed_in).await?;
    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Password Reset
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_page(
    OptionalAuth(user): OptionalAuth,
    nonce: CspNonce,
    Query(query): Query<MessageQuery>,
) -> ForgotPasswordTemplate {
    ForgotPasswordTemplate {
        page: Page::new(user, &nonce).with_messages(&query),
    }
}

/// Send a reset link. The reply is the same whether or not the email exists.
#[instrument(skip_all)]
pub async fn forgot(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Redirect> {
    AuthService::new(UserRepository::new(state.store()))
        .with_mailer(state.email())
        .send_password_reset(&form.email, &state.config().base_url)
        .await?;
    Ok(Redirect::to("/auth/forgot?success=reset_sent"))
}

/// Display the reset password page.
pub async fn reset_page(
    OptionalAuth(user): OptionalAuth,
    nonce: CspNonce,
    Query(query): Query<ResetQuery>,
) -> ResetPasswordTemplate {
    ResetPasswordTemplate {
        token: query.token,
        page: Page::new(user, &nonce).with_messages(&query.messages),
    }
}

/// Set a new password with a reset token.
#[instrument(skip_all)]
pub async fn reset(
    State(state): State<AppState>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response> {
    let retry = |code: &str| {
        Redirect::to(&format!(
            "/auth/reset?token={}&error={code}",
            urlencoding::encode(&form.token)
        ))
        .into_response()
    };
    if form.password != form.password_confirm {
        return Ok(retry("mismatch"));
    }

    match AuthService::new(UserRepository::new(state.store()))
        .reset_password(&form.token, &form.password)
        .await
    {
        Ok(()) => Ok(Redirect::to("/auth/login?success=password_changed").into_response()),
        Err(AuthError::WeakPassword(_)) => Ok(retry("weak_password")),
        Err(AuthError::InvalidResetToken | AuthError::UserNotFound) => {
            Ok(Redirect::to("/auth/forgot?error=reset_invalid").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_rejects_offsite_targets() {
        assert_eq!(safe_next(Some("/courses/c1/watch")), "/courses/c1/watch");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
