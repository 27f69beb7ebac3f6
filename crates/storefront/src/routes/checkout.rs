//! Checkout route handlers.
//!
//! Checkout needs a signed-in customer and a non-empty cart. The order is
//! placed by the catalog API; on success the cart is dropped from the
//! session and the customer lands on the confirmation page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::{OrderId, ShippingAddress};

use super::account::OrderView;
use super::cart::{CartView, forget_cart, load_cart};
use super::layout::{Layout, Notice, session_expired};
use super::products::not_found;
use crate::api::ApiError;
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Shipping form data. Also used to refill the form after an error.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ShippingForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

impl ShippingForm {
    /// The trimmed address as sent to the API.
    #[must_use]
    pub fn to_address(&self) -> ShippingAddress {
        ShippingAddress {
            full_name: self.full_name.clone(),
            line1: self.line1.clone(),
            line2: Some(self.line2.clone()),
            city: self.city.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
        }
        .trimmed()
    }

    /// One message per missing required field.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.to_address()
            .validate()
            .iter()
            .map(|field| format!("{} is required.", field.label()))
            .collect()
    }
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub form: ShippingForm,
    pub email: String,
    pub errors: Vec<String>,
    pub notice: Option<Notice>,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/complete.html")]
pub struct CompleteTemplate {
    pub layout: Layout,
    pub order: Option<OrderView>,
    pub notice: Option<Notice>,
}

/// Display the shipping form.
#[instrument(skip_all, fields(user_id = %current.id()))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    RequireAuth(current): RequireAuth,
) -> Response {
    let cart = match load_cart(&state, &session).await {
        Ok(Some(cart)) if !cart.is_empty() => cart,
        Ok(_) => return Redirect::to("/cart").into_response(),
        Err(e) => {
            let shop = state.shop();
            return CheckoutTemplate {
                layout,
                cart: CartView::empty(shop.currency),
                form: ShippingForm::default(),
                email: current.user.email.to_string(),
                errors: Vec::new(),
                notice: Some(Notice::from_api(&e, "/checkout")),
            }
            .into_response();
        }
    };

    let shop = state.shop();
    CheckoutTemplate {
        layout,
        cart: CartView::new(&cart, &shop.shipping, shop.currency),
        form: ShippingForm {
            full_name: current.user.name.clone(),
            ..ShippingForm::default()
        },
        email: current.user.email.to_string(),
        errors: Vec::new(),
        notice: None,
    }
    .into_response()
}

/// Place the order.
#[instrument(skip_all, fields(user_id = %current.id()))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    RequireAuth(current): RequireAuth,
    Form(form): Form<ShippingForm>,
) -> Response {
    let cart = match load_cart(&state, &session).await {
        Ok(Some(cart)) if !cart.is_empty() => cart,
        Ok(_) => return Redirect::to("/cart").into_response(),
        Err(e) => {
            let shop = state.shop();
            return CheckoutTemplate {
                layout,
                cart: CartView::empty(shop.currency),
                form,
                email: current.user.email.to_string(),
                errors: Vec::new(),
                notice: Some(Notice::from_api(&e, "/checkout")),
            }
            .into_response();
        }
    };

    let shop = state.shop();
    let rerender = |form: ShippingForm, errors: Vec<String>, notice: Option<Notice>| {
        CheckoutTemplate {
            layout: layout.clone(),
            cart: CartView::new(&cart, &shop.shipping, shop.currency),
            form,
            email: current.user.email.to_string(),
            errors,
            notice,
        }
    };

    let errors = form.errors();
    if !errors.is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, rerender(form, errors, None)).into_response();
    }

    match state
        .api()
        .place_order(&current.token, &cart.id, &form.to_address())
        .await
    {
        Ok(order) => {
            tracing::info!(order_id = %order.id, "Order placed");
            add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));
            forget_cart(&session).await;
            let url = format!(
                "/checkout/complete/{}",
                urlencoding::encode(order.id.as_str())
            );
            Redirect::to(&url).into_response()
        }
        Err(ApiError::Unauthorized) => session_expired(&session, "/checkout").await,
        Err(ApiError::Validation(message) | ApiError::Conflict(message)) => {
            tracing::info!("Order rejected: {message}");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                rerender(form, vec![message], None),
            )
                .into_response()
        }
        Err(e) => rerender(form, Vec::new(), Some(Notice::from_api(&e, "/checkout"))).into_response(),
    }
}

/// Display the order confirmation page.
#[instrument(skip(state, session, layout, current), fields(order_id = %id))]
pub async fn complete(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    RequireAuth(current): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let id = OrderId::new(id);
    let here = format!("/checkout/complete/{}", urlencoding::encode(id.as_str()));

    match state.api().get_order(&current.token, &id).await {
        Ok(order) => CompleteTemplate {
            layout,
            order: Some(OrderView::new(&order, state.shop().currency)),
            notice: None,
        }
        .into_response(),
        Err(ApiError::NotFound(_)) => not_found(layout, "We couldn't find that order."),
        Err(ApiError::Unauthorized) => session_expired(&session, &here).await,
        Err(e) => CompleteTemplate {
            layout,
            order: None,
            notice: Some(Notice::from_api(&e, here)),
        }
        .into_response(),
    }
}
