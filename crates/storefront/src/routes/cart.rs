//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The catalog cart ID lives in the session; guests get a cart too.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::{Cart, CartId, CartItem, CurrencyCode, ProductId, ShippingPolicy};

use super::layout::{Layout, Notice, flash, flash_message, is_htmx, money};
use super::products::{ErrorFragmentTemplate, product_url};
use crate::api::ApiError;
use crate::filters;
use crate::models::session_keys;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone, Debug)]
pub struct CartItemView {
    pub product_id: String,
    pub url: String,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: String,
    pub regular_price: Option<String>,
    pub quantity: u32,
    pub line_total: String,
    pub stock: u32,
    /// Quantity the minus button submits (0 removes the line).
    pub decrease_to: u32,
    pub increase_to: u32,
    pub can_increase: bool,
}

impl CartItemView {
    #[must_use]
    pub fn new(item: &CartItem, currency: CurrencyCode) -> Self {
        let product = &item.product;
        Self {
            product_id: product.id.to_string(),
            url: product_url(&product.id),
            name: product.name.clone(),
            image: product.image.clone().filter(|url| !url.trim().is_empty()),
            unit_price: money(product.effective_price(), currency),
            regular_price: product
                .is_on_sale()
                .then(|| money(product.price, currency)),
            quantity: item.quantity,
            line_total: money(item.line_total(), currency),
            stock: product.stock,
            decrease_to: item.quantity.saturating_sub(1),
            increase_to: item.quantity.saturating_add(1),
            can_increase: item.quantity < product.stock,
        }
    }
}

/// Cart display data for templates.
#[derive(Clone, Debug)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub subtotal: String,
    /// "Free" or the flat rate.
    pub shipping: String,
    pub total: String,
    /// e.g. "$12.00" more for free shipping.
    pub free_shipping_remaining: Option<String>,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, shipping: &ShippingPolicy, currency: CurrencyCode) -> Self {
        let summary = cart.summary(shipping);
        Self {
            items: cart
                .items
                .iter()
                .map(|item| CartItemView::new(item, currency))
                .collect(),
            item_count: summary.item_count,
            subtotal: money(summary.subtotal, currency),
            shipping: if summary.shipping.is_zero() {
                "Free".to_string()
            } else {
                money(summary.shipping, currency)
            },
            total: money(summary.total, currency),
            free_shipping_remaining: if cart.is_empty() {
                None
            } else {
                shipping
                    .remaining_for_free(summary.subtotal)
                    .map(|amount| money(amount, currency))
            },
        }
    }

    /// Create an empty cart.
    #[must_use]
    pub fn empty(currency: CurrencyCode) -> Self {
        Self {
            items: Vec::new(),
            item_count: 0,
            subtotal: money(rust_decimal::Decimal::ZERO, currency),
            shipping: "Free".to_string(),
            total: money(rust_decimal::Decimal::ZERO, currency),
            free_shipping_remaining: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn from_state(cart: Option<&Cart>, state: &AppState) -> Self {
        let shop = state.shop();
        cart.map_or_else(
            || Self::empty(shop.currency),
            |cart| Self::new(cart, &shop.shipping, shop.currency),
        )
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart ID from the session.
pub(crate) async fn get_cart_id(session: &Session) -> Option<CartId> {
    session
        .get::<CartId>(session_keys::CART_ID)
        .await
        .ok()
        .flatten()
}

/// Set the cart ID in the session.
async fn set_cart_id(
    session: &Session,
    cart_id: &CartId,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART_ID, cart_id).await
}

/// Forget the session's cart (after checkout, or when the API no longer knows it).
pub(crate) async fn forget_cart(session: &Session) {
    if let Err(e) = session.remove::<CartId>(session_keys::CART_ID).await {
        tracing::error!("Failed to remove cart ID from session: {e}");
    }
}

/// Load the session's cart.
///
/// Returns `Ok(None)` when there is no cart yet. A cart the API no longer
/// knows is dropped from the session and treated the same way.
pub(crate) async fn load_cart(
    state: &AppState,
    session: &Session,
) -> Result<Option<Cart>, ApiError> {
    let Some(cart_id) = get_cart_id(session).await else {
        return Ok(None);
    };

    match state.api().get_cart(&cart_id).await {
        Ok(cart) => Ok(Some(cart)),
        Err(ApiError::NotFound(_)) => {
            tracing::info!(cart_id = %cart_id, "Cart expired, starting a new one");
            forget_cart(session).await;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Flash codes carried back to the cart page.
#[derive(Debug, Default, Deserialize)]
pub struct CartPageQuery {
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub error: Option<String>,
    pub notice: Option<Notice>,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Confirmation shown next to an add-to-cart button (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_added.html")]
pub struct CartAddedTemplate {
    pub count: u32,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Responses
// =============================================================================

/// Answer a successful mutation: fragment for HTMX, redirect otherwise.
fn updated(headers: &HeaderMap, fragment: impl IntoResponse) -> Response {
    if is_htmx(headers) {
        (AppendHeaders([("HX-Trigger", "cart-updated")]), fragment).into_response()
    } else {
        Redirect::to("/cart").into_response()
    }
}

/// Answer a failed mutation.
fn failed(headers: &HeaderMap, code: &str, message: Option<String>) -> Response {
    if is_htmx(headers) {
        let message = message.unwrap_or_else(|| flash_message(code).to_string());
        ErrorFragmentTemplate {
            notice: Notice::new(message, "/cart"),
        }
        .into_response()
    } else {
        Redirect::to(&format!("/cart?error={code}")).into_response()
    }
}

fn empty_items(state: &AppState) -> CartItemsTemplate {
    CartItemsTemplate {
        cart: CartView::empty(state.shop().currency),
    }
}

fn api_failed(headers: &HeaderMap, err: &ApiError) -> Response {
    let notice = Notice::from_api(err, "/cart");
    failed(headers, "cart_failed", Some(notice.message))
}

/// Answer the result of a cart mutation with the refreshed items.
///
/// A cart the API no longer knows is dropped from the session and shown empty.
async fn mutated(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    result: Result<Cart, ApiError>,
) -> Response {
    match result {
        Ok(cart) => updated(
            headers,
            CartItemsTemplate {
                cart: CartView::from_state(Some(&cart), state),
            },
        ),
        Err(ApiError::NotFound(_)) => {
            tracing::info!("Cart expired during update, starting over");
            forget_cart(session).await;
            updated(headers, empty_items(state))
        }
        Err(e) => api_failed(headers, &e),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, session, layout))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Query(query): Query<CartPageQuery>,
) -> impl IntoResponse {
    let (cart, notice) = match load_cart(&state, &session).await {
        Ok(cart) => (CartView::from_state(cart.as_ref(), &state), None),
        Err(e) => (
            CartView::empty(state.shop().currency),
            Some(Notice::from_api(&e, "/cart")),
        ),
    };

    CartShowTemplate {
        layout,
        cart,
        error: flash(query.error.as_deref()),
        notice,
    }
}

/// Add item to cart.
///
/// Creates a new cart if one doesn't exist. The quantity is clamped so the
/// line never exceeds the product's stock.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let product_id = ProductId::new(form.product_id);

    let product = match state.api().get_product(&product_id).await {
        Ok(product) => product,
        Err(e) => return api_failed(&headers, &e),
    };

    let existing = match load_cart(&state, &session).await {
        Ok(cart) => cart,
        Err(e) => return api_failed(&headers, &e),
    };

    let in_cart = existing
        .as_ref()
        .and_then(|cart| cart.item(&product_id))
        .map_or(0, |item| item.quantity);
    let quantity = form
        .quantity
        .unwrap_or(1)
        .max(1)
        .min(product.stock.saturating_sub(in_cart));

    if quantity == 0 {
        return failed(&headers, "out_of_stock", None);
    }

    let cart_id = match existing {
        Some(cart) => cart.id,
        None => match state.api().create_cart().await {
            Ok(cart) => {
                if let Err(e) = set_cart_id(&session, &cart.id).await {
                    tracing::error!("Failed to save cart ID to session: {e}");
                }
                cart.id
            }
            Err(e) => return api_failed(&headers, &e),
        },
    };

    match state.api().add_to_cart(&cart_id, &product_id, quantity).await {
        Ok(cart) => updated(
            &headers,
            CartAddedTemplate {
                count: cart.item_count(),
            },
        ),
        Err(e) => api_failed(&headers, &e),
    }
}

/// Set the quantity of a cart line. Zero removes it.
#[instrument(skip(state, session, headers))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    let cart = match load_cart(&state, &session).await {
        Ok(Some(cart)) => cart,
        Ok(None) => return updated(&headers, empty_items(&state)),
        Err(e) => return api_failed(&headers, &e),
    };

    let product_id = ProductId::new(form.product_id);
    let Some(item) = cart.item(&product_id) else {
        return updated(
            &headers,
            CartItemsTemplate {
                cart: CartView::from_state(Some(&cart), &state),
            },
        );
    };

    let quantity = item.clamp_quantity(form.quantity);
    let result = if quantity == 0 {
        state.api().remove_cart_item(&cart.id, &product_id).await
    } else {
        state
            .api()
            .update_cart_item(&cart.id, &product_id, quantity)
            .await
    };

    mutated(&state, &session, &headers, result).await
}

/// Remove a line from the cart.
#[instrument(skip(state, session, headers))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let Some(cart_id) = get_cart_id(&session).await else {
        return updated(&headers, empty_items(&state));
    };

    let product_id = ProductId::new(form.product_id);
    let result = state.api().remove_cart_item(&cart_id, &product_id).await;
    mutated(&state, &session, &headers, result).await
}

/// Empty the cart. The cart itself is kept for further use.
#[instrument(skip(state, session, headers))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Response {
    let Some(cart_id) = get_cart_id(&session).await else {
        return updated(&headers, empty_items(&state));
    };

    let result = state.api().clear_cart(&cart_id).await;
    mutated(&state, &session, &headers, result).await
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let count = match load_cart(&state, &session).await {
        Ok(cart) => cart.map_or(0, |cart| cart.item_count()),
        Err(e) => {
            tracing::warn!("Failed to fetch cart count: {e}");
            0
        }
    };

    CartCountTemplate { count }
}
