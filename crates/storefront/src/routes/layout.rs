//! Shared page chrome and helpers used by every route module.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use tower_sessions::Session;

use harbor_core::{CurrencyCode, Price};

use crate::api::ApiError;
use crate::middleware::{CspNonce, OptionalAuth, clear_current_user, login_url};
use crate::state::AppState;

/// Data every full page needs for `base.html`.
#[derive(Clone, Debug)]
pub struct Layout {
    pub store_name: String,
    /// Greeting name of the signed-in customer.
    pub user_name: Option<String>,
    pub nonce: String,
}

impl Layout {
    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.user_name.is_some()
    }
}

impl FromRequestParts<AppState> for Layout {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CspNonce(nonce) = CspNonce::from_request_parts(parts, state).await?;
        let OptionalAuth(current) = OptionalAuth::from_request_parts(parts, state).await?;

        Ok(Self {
            store_name: state.shop().name.clone(),
            user_name: current.map(|c| c.user.greeting_name().to_string()),
            nonce,
        })
    }
}

/// An API failure shown inline, with a link to try again.
#[derive(Clone, Debug)]
pub struct Notice {
    pub message: String,
    pub retry_url: String,
}

impl Notice {
    #[must_use]
    pub fn new(message: impl Into<String>, retry_url: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry_url: retry_url.into(),
        }
    }

    /// Log the error and describe it for the page.
    #[must_use]
    pub fn from_api(err: &ApiError, retry_url: impl Into<String>) -> Self {
        if err.is_server_fault() {
            tracing::error!(error = %err, "Catalog API request failed");
        } else {
            tracing::warn!(error = %err, "Catalog API request rejected");
        }
        Self::new(err.user_message(), retry_url)
    }
}

/// Whether the request was made by htmx.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Format an amount in the store currency.
#[must_use]
pub fn money(amount: Decimal, currency: CurrencyCode) -> String {
    Price::new(amount, currency).display()
}

/// Only allow redirects to local absolute paths.
///
/// Rejects protocol-relative (`//evil.test`) and backslash tricks.
#[must_use]
pub fn safe_next(next: Option<&str>) -> Option<String> {
    next.map(str::trim)
        .filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
        .map(str::to_string)
}

/// The token was rejected: forget the signed-in user and send them to log in.
pub async fn session_expired(session: &Session, next: &str) -> Response {
    if let Err(e) = clear_current_user(session).await {
        tracing::error!("Failed to clear expired session: {e}");
    }
    crate::error::clear_sentry_user();
    let url = login_url(next);
    let separator = if url.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{url}{separator}error=session_expired")).into_response()
}

/// Human message for an `error=` or `success=` code in a redirect.
#[must_use]
pub fn flash_message(code: &str) -> &'static str {
    match code {
        // Errors
        "credentials" => "The email or password is incorrect.",
        "session" => "Something went wrong saving your session. Please try again.",
        "session_expired" => "Your session has expired. Please sign in again.",
        "rate_limited" => "Too many attempts. Please wait a moment and try again.",
        "name_required" => "Please enter your name.",
        "invalid_email" => "Please enter a valid email address.",
        "password_too_short" => "Passwords must be at least 8 characters.",
        "password_mismatch" => "The passwords don't match.",
        "email_taken" => "An account with this email already exists.",
        "rejected" => "The store couldn't accept those details. Please check them and try again.",
        "invalid_reset_link" => "That reset link is invalid. Request a new one below.",
        "reset_failed" => "That reset link has expired. Request a new one below.",
        "wrong_password" => "Your current password is incorrect.",
        "out_of_stock" => "Sorry, that item is out of stock.",
        "cart_failed" => "We couldn't update your cart. Please try again.",
        "unavailable" => "We couldn't reach the store right now. Please try again.",
        // Successes
        "email_sent" => "If an account exists for that email, a reset link is on its way.",
        "password_reset" => "Your password has been reset. Please sign in.",
        "profile_updated" => "Your profile has been updated.",
        "password_changed" => "Your password has been changed.",
        "welcome" => "Welcome! Your account is ready.",
        _ => "Something went wrong. Please try again.",
    }
}

/// Resolve an optional flash code to its message.
#[must_use]
pub fn flash(code: Option<&str>) -> Option<String> {
    code.filter(|c| !c.is_empty())
        .map(|c| flash_message(c).to_string())
}
