//! Account route handlers.
//!
//! Every handler here requires a signed-in customer. The bearer token from
//! the session authorizes the catalog API calls; a rejected token sends the
//! customer back to the login page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::{CurrencyCode, Email, Order, OrderId, OrderLine};

use super::auth::{PasswordCheck, check_new_password};
use super::layout::{Layout, Notice, flash, money, session_expired};
use super::products::{not_found, product_url};
use crate::api::ApiError;
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Orders shown on the account overview.
const RECENT_ORDERS: usize = 3;

// =============================================================================
// Views
// =============================================================================

/// Order line display data for templates.
#[derive(Clone, Debug)]
pub struct OrderLineView {
    pub name: String,
    pub url: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl OrderLineView {
    fn new(line: &OrderLine, currency: CurrencyCode) -> Self {
        Self {
            name: line.name.clone(),
            url: product_url(&line.product_id),
            quantity: line.quantity,
            unit_price: money(line.unit_price, currency),
            line_total: money(line.line_total(), currency),
        }
    }
}

/// Order display data for templates.
#[derive(Clone, Debug)]
pub struct OrderView {
    pub id: String,
    pub url: String,
    pub placed_on: String,
    pub status: String,
    /// CSS modifier, e.g. `status-shipped`.
    pub status_class: String,
    pub item_count: u32,
    pub total: String,
    pub items: Vec<OrderLineView>,
    pub ship_to_name: String,
    pub ship_to: String,
}

impl OrderView {
    #[must_use]
    pub fn new(order: &Order, currency: CurrencyCode) -> Self {
        Self {
            id: order.id.to_string(),
            url: format!("/account/orders/{}", urlencoding::encode(order.id.as_str())),
            placed_on: order.created_at.format("%B %-d, %Y").to_string(),
            status: order.status.label().to_string(),
            status_class: format!("status-{}", order.status.label().to_lowercase()),
            item_count: order.item_count(),
            total: money(order.total, currency),
            items: order
                .items
                .iter()
                .map(|line| OrderLineView::new(line, currency))
                .collect(),
            ship_to_name: order.shipping_address.full_name.clone(),
            ship_to: order.shipping_address.one_line(),
        }
    }
}

/// Profile display data for templates.
#[derive(Clone, Debug)]
pub struct ProfileView {
    pub name: String,
    pub email: String,
}

impl From<&CurrentUser> for ProfileView {
    fn from(current: &CurrentUser) -> Self {
        Self {
            name: current.user.name.clone(),
            email: current.user.email.to_string(),
        }
    }
}

// =============================================================================
// Form and Query Types
// =============================================================================

/// Profile edit form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
}

/// Password change form data.
#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub current_password: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Account overview template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub layout: Layout,
    pub profile: ProfileView,
    /// The most recent few.
    pub orders: Vec<OrderView>,
    pub has_more_orders: bool,
    pub success: Option<String>,
    pub notice: Option<Notice>,
}

/// Profile edit template.
#[derive(Template, WebTemplate)]
#[template(path = "account/edit.html")]
pub struct AccountEditTemplate {
    pub layout: Layout,
    pub profile: ProfileView,
    pub error: Option<String>,
}

/// Password change template.
#[derive(Template, WebTemplate)]
#[template(path = "account/password.html")]
pub struct AccountPasswordTemplate {
    pub layout: Layout,
    pub error: Option<String>,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderView>,
    pub notice: Option<Notice>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "account/order.html")]
pub struct OrderTemplate {
    pub layout: Layout,
    pub order: Option<OrderView>,
    pub notice: Option<Notice>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display account overview page.
///
/// Refreshes the session's copy of the user so edits made elsewhere show up.
#[instrument(skip(state, session, layout, current), fields(user_id = %current.id()))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    RequireAuth(current): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    let (user, orders) = tokio::join!(
        state.api().current_user(&current.token),
        state.api().list_orders(&current.token)
    );

    if matches!(user, Err(ApiError::Unauthorized)) || matches!(orders, Err(ApiError::Unauthorized)) {
        return Ok(session_expired(&session, "/account").await);
    }

    let current = match user {
        Ok(user) => {
            let refreshed = current.with_user(user);
            set_current_user(&session, &refreshed).await?;
            refreshed
        }
        Err(e) => {
            tracing::warn!("Failed to refresh user: {e}");
            current
        }
    };

    let currency = state.shop().currency;
    let (orders, has_more_orders, notice) = match orders {
        Ok(orders) => (
            orders
                .iter()
                .take(RECENT_ORDERS)
                .map(|order| OrderView::new(order, currency))
                .collect(),
            orders.len() > RECENT_ORDERS,
            None,
        ),
        Err(e) => (Vec::new(), false, Some(Notice::from_api(&e, "/account"))),
    };

    Ok(AccountIndexTemplate {
        layout,
        profile: ProfileView::from(&current),
        orders,
        has_more_orders,
        success: flash(query.success.as_deref()),
        notice,
    }
    .into_response())
}

/// Display profile edit page.
#[instrument(skip_all)]
pub async fn edit_page(
    layout: Layout,
    RequireAuth(current): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    AccountEditTemplate {
        layout,
        profile: ProfileView::from(&current),
        error: flash(query.error.as_deref()),
    }
}

/// Handle profile edit form submission.
#[instrument(skip_all, fields(user_id = %current.id()))]
pub async fn edit(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    let name = form.name.trim();
    if name.is_empty() {
        return Ok(Redirect::to("/account/edit?error=name_required").into_response());
    }
    let Ok(email) = Email::parse(&form.email) else {
        return Ok(Redirect::to("/account/edit?error=invalid_email").into_response());
    };

    match state
        .api()
        .update_profile(&current.token, name, email.as_str())
        .await
    {
        Ok(user) => {
            set_current_user(&session, &current.with_user(user)).await?;
            Ok(Redirect::to("/account?success=profile_updated").into_response())
        }
        Err(ApiError::Unauthorized) => Ok(session_expired(&session, "/account/edit").await),
        Err(ApiError::Conflict(_)) => {
            Ok(Redirect::to("/account/edit?error=email_taken").into_response())
        }
        Err(ApiError::Validation(message)) => {
            tracing::info!("Profile update rejected: {message}");
            Ok(Redirect::to("/account/edit?error=rejected").into_response())
        }
        Err(e) => {
            tracing::error!("Profile update failed: {e}");
            Ok(Redirect::to("/account/edit?error=unavailable").into_response())
        }
    }
}

/// Display password change page.
#[instrument(skip_all)]
pub async fn password_page(
    layout: Layout,
    RequireAuth(_current): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    AccountPasswordTemplate {
        layout,
        error: flash(query.error.as_deref()),
    }
}

/// Handle password change form submission.
#[instrument(skip_all, fields(user_id = %current.id()))]
pub async fn change_password(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Form(form): Form<PasswordForm>,
) -> Result<Response> {
    if let PasswordCheck::Invalid(code) = check_new_password(&form.password, &form.password_confirm)
    {
        return Ok(Redirect::to(&format!("/account/password?error={code}")).into_response());
    }

    match state
        .api()
        .change_password(&current.token, &form.current_password, &form.password)
        .await
    {
        Ok(()) => Ok(Redirect::to("/account?success=password_changed").into_response()),
        Err(ApiError::Unauthorized) => Ok(session_expired(&session, "/account/password").await),
        Err(ApiError::Validation(_)) => {
            Ok(Redirect::to("/account/password?error=wrong_password").into_response())
        }
        Err(e) => {
            tracing::error!("Password change failed: {e}");
            Ok(Redirect::to("/account/password?error=unavailable").into_response())
        }
    }
}

/// Display order history page.
#[instrument(skip_all, fields(user_id = %current.id()))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    RequireAuth(current): RequireAuth,
) -> Response {
    match state.api().list_orders(&current.token).await {
        Ok(orders) => OrdersTemplate {
            layout,
            orders: orders
                .iter()
                .map(|order| OrderView::new(order, state.shop().currency))
                .collect(),
            notice: None,
        }
        .into_response(),
        Err(ApiError::Unauthorized) => session_expired(&session, "/account/orders").await,
        Err(e) => OrdersTemplate {
            layout,
            orders: Vec::new(),
            notice: Some(Notice::from_api(&e, "/account/orders")),
        }
        .into_response(),
    }
}

/// Display order detail page.
#[instrument(skip(state, session, layout, current), fields(order_id = %id))]
pub async fn order(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    RequireAuth(current): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let id = OrderId::new(id);
    let here = format!("/account/orders/{}", urlencoding::encode(id.as_str()));

    match state.api().get_order(&current.token, &id).await {
        Ok(order) => OrderTemplate {
            layout,
            order: Some(OrderView::new(&order, state.shop().currency)),
            notice: None,
        }
        .into_response(),
        Err(ApiError::NotFound(_)) => not_found(layout, "We couldn't find that order."),
        Err(ApiError::Unauthorized) => session_expired(&session, &here).await,
        Err(e) => OrderTemplate {
            layout,
            order: None,
            notice: Some(Notice::from_api(&e, here)),
        }
        .into_response(),
    }
}
