//! Authentication route handlers.
//!
//! Handles login, registration, password reset, and logout. The catalog API
//! owns credentials; a successful login or registration yields a bearer
//! token that is kept in the session next to the user record.

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

use harbor_core::Email;

use super::layout::{Layout, flash, safe_next};
use crate::api::{ApiError, AuthSession};
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Shortest password the storefront accepts.
pub const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// Validation
// =============================================================================

/// Outcome of checking a new password and its confirmation.
#[derive(Debug, PartialEq, Eq)]
pub enum PasswordCheck {
    Ok,
    /// Flash code describing the problem.
    Invalid(&'static str),
}

/// Check a new password against the length rule and its confirmation.
#[must_use]
pub fn check_new_password(password: &str, confirmation: &str) -> PasswordCheck {
    if password.chars().count() < MIN_PASSWORD_LEN {
        PasswordCheck::Invalid("password_too_short")
    } else if password != confirmation {
        PasswordCheck::Invalid("password_mismatch")
    } else {
        PasswordCheck::Ok
    }
}

/// Check a registration form, returning the first problem's flash code.
fn check_registration(form: &RegisterForm) -> Result<Email, &'static str> {
    if form.name.trim().is_empty() {
        return Err("name_required");
    }
    let email = Email::parse(&form.email).map_err(|_| "invalid_email")?;
    if let PasswordCheck::Invalid(code) = check_new_password(&form.password, &form.password_confirm)
    {
        return Err(code);
    }
    Ok(email)
}

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
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

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
    pub next: Option<String>,
}

/// Query parameters for the reset link in the email.
#[derive(Default, Deserialize)]
pub struct ResetQuery {
    pub token: Option<String>,
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub error: Option<String>,
    pub success: Option<String>,
    pub next: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub error: Option<String>,
    pub min_password_len: usize,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub layout: Layout,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub layout: Layout,
    pub error: Option<String>,
    pub token: String,
    pub min_password_len: usize,
}

// =============================================================================
// Helpers
// =============================================================================

/// Login page URL carrying an error code and the `next` target.
fn login_error(code: &str, next: Option<&str>) -> String {
    safe_next(next).map_or_else(
        || format!("/auth/login?error={code}"),
        |next| format!("/auth/login?error={code}&next={}", urlencoding::encode(&next)),
    )
}

/// Store a fresh sign-in in a new session ID.
async fn sign_in(session: &Session, auth: AuthSession) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    let current = CurrentUser::from(auth);
    set_current_user(session, &current).await?;

    set_sentry_user(current.id(), Some(current.user.email.as_str()));
    add_breadcrumb("auth", "Signed in", None);
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(layout: Layout, Query(query): Query<MessageQuery>) -> Response {
    if layout.signed_in() {
        let target = safe_next(query.next.as_deref()).unwrap_or_else(|| "/account".to_string());
        return Redirect::to(&target).into_response();
    }

    LoginTemplate {
        layout,
        error: flash(query.error.as_deref()),
        success: flash(query.success.as_deref()),
        next: safe_next(query.next.as_deref()),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = form.next.as_deref();

    match state.api().login(form.email.trim(), &form.password).await {
        Ok(auth) => {
            if let Err(e) = sign_in(&session, auth).await {
                tracing::error!("Failed to set session: {e}");
                return Redirect::to(&login_error("session", next)).into_response();
            }
            let target = safe_next(next).unwrap_or_else(|| "/account".to_string());
            Redirect::to(&target).into_response()
        }
        Err(ApiError::Unauthorized | ApiError::Validation(_) | ApiError::NotFound(_)) => {
            tracing::info!("Login rejected");
            Redirect::to(&login_error("credentials", next)).into_response()
        }
        Err(ApiError::RateLimited(_)) => {
            Redirect::to(&login_error("rate_limited", next)).into_response()
        }
        Err(e) => {
            tracing::error!("Login failed: {e}");
            Redirect::to(&login_error("unavailable", next)).into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(layout: Layout, Query(query): Query<MessageQuery>) -> impl IntoResponse {
    RegisterTemplate {
        layout,
        error: flash(query.error.as_deref()),
        min_password_len: MIN_PASSWORD_LEN,
    }
}

/// Handle registration form submission.
///
/// The new account is signed in straight away.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let email = match check_registration(&form) {
        Ok(email) => email,
        Err(code) => return Redirect::to(&format!("/auth/register?error={code}")).into_response(),
    };

    match state
        .api()
        .register(form.name.trim(), email.as_str(), &form.password)
        .await
    {
        Ok(auth) => {
            if let Err(e) = sign_in(&session, auth).await {
                tracing::error!("Failed to set session after registration: {e}");
                return Redirect::to("/auth/login?error=session").into_response();
            }
            Redirect::to("/account?success=welcome").into_response()
        }
        Err(ApiError::Conflict(_)) => {
            Redirect::to("/auth/register?error=email_taken").into_response()
        }
        Err(ApiError::Validation(message)) => {
            tracing::info!("Registration rejected: {message}");
            Redirect::to("/auth/register?error=rejected").into_response()
        }
        Err(ApiError::RateLimited(_)) => {
            Redirect::to("/auth/register?error=rate_limited").into_response()
        }
        Err(e) => {
            tracing::error!("Registration failed: {e}");
            Redirect::to("/auth/register?error=unavailable").into_response()
        }
    }
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(
    layout: Layout,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    ForgotPasswordTemplate {
        layout,
        error: flash(query.error.as_deref()),
        success: flash(query.success.as_deref()),
    }
}

/// Handle forgot password form submission.
///
/// Always reports success so the form can't be used to discover which accounts exist.
#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    let Ok(email) = Email::parse(&form.email) else {
        return Redirect::to("/auth/forgot-password?error=invalid_email").into_response();
    };

    if let Err(e) = state.api().forgot_password(email.as_str()).await {
        tracing::warn!("Password recovery request failed: {e}");
    }

    Redirect::to("/auth/forgot-password?success=email_sent").into_response()
}

/// Display the reset password page.
///
/// Reached from the link in the reset email, which carries the token.
pub async fn reset_password_page(layout: Layout, Query(query): Query<ResetQuery>) -> Response {
    match query.token.filter(|t| !t.trim().is_empty()) {
        Some(token) => ResetPasswordTemplate {
            layout,
            error: flash(query.error.as_deref()),
            token,
            min_password_len: MIN_PASSWORD_LEN,
        }
        .into_response(),
        None => Redirect::to("/auth/forgot-password?error=invalid_reset_link").into_response(),
    }
}

/// Handle reset password form submission.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    let token = form.token.trim();
    if token.is_empty() {
        return Redirect::to("/auth/forgot-password?error=invalid_reset_link").into_response();
    }

    let back = |code: &str| {
        Redirect::to(&format!(
            "/auth/reset-password?token={}&error={code}",
            urlencoding::encode(token)
        ))
        .into_response()
    };

    if let PasswordCheck::Invalid(code) = check_new_password(&form.password, &form.password_confirm)
    {
        return back(code);
    }

    match state.api().reset_password(token, &form.password).await {
        Ok(()) => Redirect::to("/auth/login?success=password_reset").into_response(),
        Err(ApiError::Validation(_) | ApiError::NotFound(_) | ApiError::Unauthorized) => {
            Redirect::to("/auth/forgot-password?error=reset_failed").into_response()
        }
        Err(e) => {
            tracing::error!("Password reset failed: {e}");
            back("unavailable")
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
///
/// Revokes the token (best effort) and destroys the whole session.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(current): OptionalAuth,
) -> Response {
    if let Some(current) = current
        && let Err(e) = state.api().logout(&current.token).await
    {
        tracing::warn!("Failed to revoke access token: {e}");
    }

    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {e}");
    }
    clear_sentry_user();

    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {e}");
    }

    Redirect::to("/").into_response()
}
