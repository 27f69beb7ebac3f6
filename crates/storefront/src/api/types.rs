//! Wire types for the catalog API that don't belong in `harbor-core`.
//!
//! Entities (products, carts, users, orders) live in `harbor-core`; this module
//! holds request bodies, response envelopes, and the bearer token.

use harbor_core::{
    CartId, Page, Product, ProductId, ShippingAddress, User,
};
use serde::{Deserialize, Serialize};

/// Bearer token issued by the catalog API on login or registration.
///
/// Stored in the session. `Debug` is redacted so the token never reaches logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Successful login or registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub token: AccessToken,
    pub user: User,
}

/// `GET /products` response envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductListResponse {
    pub products: Vec<Product>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total: u64,
}

const fn first_page() -> u32 {
    1
}

impl From<ProductListResponse> for Page<Product> {
    fn from(response: ProductListResponse) -> Self {
        Self {
            items: response.products,
            page: response.page.max(1),
            total_pages: response.total_pages,
            total: response.total,
        }
    }
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddItemRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuantityRequest {
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmailRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResetPasswordRequest<'a> {
    pub token: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProfileRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChangePasswordRequest<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaceOrderRequest<'a> {
    pub cart_id: &'a CartId,
    pub shipping_address: &'a ShippingAddress,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("eyJhbGciOi.secret.sig");
        assert!(!format!("{token:?}").contains("secret"));
        assert_eq!(token.expose(), "eyJhbGciOi.secret.sig");
    }

    #[test]
    fn test_product_list_defaults() {
        let response: ProductListResponse = serde_json::from_str(r#"{"products": []}"#).unwrap();
        let page: Page<Product> = response.into();
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next());
    }

    #[test]
    fn test_error_body_prefers_message() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"message": "Out of stock", "error": "Bad Request"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Out of stock"));

        let body: ErrorBody = serde_json::from_str(r#"{"error": "Bad Request"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Bad Request"));
    }

    #[test]
    fn test_place_order_request_is_camel_case() {
        let cart_id = CartId::new("c1");
        let address = ShippingAddress::default();
        let json = serde_json::to_value(PlaceOrderRequest {
            cart_id: &cart_id,
            shipping_address: &address,
        })
        .unwrap();
        assert_eq!(json["cartId"], "c1");
        assert!(json["shippingAddress"].is_object());
    }
}
