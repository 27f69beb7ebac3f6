//! Authentication, profile, and order endpoints.
//!
//! Everything here either issues a bearer token or requires one. Nothing is
//! cached.

use harbor_core::{CartId, Order, OrderId, ShippingAddress, User};
use reqwest::Method;
use tracing::instrument;

use super::client::segment;
use super::types::{
    AccessToken, AuthSession, ChangePasswordRequest, EmailRequest, LoginRequest,
    PlaceOrderRequest, ProfileRequest, RegisterRequest, ResetPasswordRequest,
};
use super::{ApiClient, ApiError};

impl ApiClient {
    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for bad credentials, or another error
    /// if the request fails.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let request = self
            .request(Method::POST, "auth/login", None)?
            .json(&LoginRequest { email, password });
        self.execute(request).await
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` if the email is taken, `ApiError::Validation`
    /// if the API rejects the input, or another error if the request fails.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ApiError> {
        let request = self
            .request(Method::POST, "auth/register", None)?
            .json(&RegisterRequest {
                name,
                email,
                password,
            });
        self.execute(request).await
    }

    /// Ask the API to send a password reset email.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, "auth/forgot-password", None)?
            .json(&EmailRequest { email });
        self.execute_empty(request).await
    }

    /// Set a new password using the token from a reset email.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if the token is invalid or expired, or
    /// another error if the request fails.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, "auth/reset-password", None)?
            .json(&ResetPasswordRequest { token, password });
        self.execute_empty(request).await
    }

    /// Revoke a bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: &AccessToken) -> Result<(), ApiError> {
        self.execute_empty(self.request(Method::POST, "auth/logout", Some(token))?)
            .await
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Get the user the token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is no longer valid.
    #[instrument(skip_all)]
    pub async fn current_user(&self, token: &AccessToken) -> Result<User, ApiError> {
        self.execute(self.request(Method::GET, "users/me", Some(token))?)
            .await
    }

    /// Change the signed-in user's name and email.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` if the email belongs to another account,
    /// or another error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn update_profile(
        &self,
        token: &AccessToken,
        name: &str,
        email: &str,
    ) -> Result<User, ApiError> {
        let request = self
            .request(Method::PUT, "users/me", Some(token))?
            .json(&ProfileRequest { name, email });
        self.execute(request).await
    }

    /// Change the signed-in user's password.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if the current password is wrong, or
    /// another error if the request fails.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        token: &AccessToken,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let request = self
            .request(Method::PUT, "users/me/password", Some(token))?
            .json(&ChangePasswordRequest {
                current_password,
                new_password,
            });
        self.execute_empty(request).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Turn a cart into an order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if the cart or address is rejected (for
    /// example, stock ran out), or another error if the request fails.
    #[instrument(skip(self, token, address), fields(cart_id = %cart_id))]
    pub async fn place_order(
        &self,
        token: &AccessToken,
        cart_id: &CartId,
        address: &ShippingAddress,
    ) -> Result<Order, ApiError> {
        let request = self
            .request(Method::POST, "orders", Some(token))?
            .json(&PlaceOrderRequest {
                cart_id,
                shipping_address: address,
            });
        self.execute(request).await
    }

    /// Get the signed-in user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn list_orders(&self, token: &AccessToken) -> Result<Vec<Order>, ApiError> {
        let mut orders: Vec<Order> = self
            .execute(self.request(Method::GET, "orders", Some(token))?)
            .await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Get one of the signed-in user's orders.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the order doesn't exist or belongs to
    /// someone else.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn get_order(&self, token: &AccessToken, id: &OrderId) -> Result<Order, ApiError> {
        let path = format!("orders/{}", segment(id.as_str()));
        self.execute(self.request(Method::GET, &path, Some(token))?)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::api::testing::MockApi;

    const TOKEN: &str = "tok_valid";

    fn user_json() -> Value {
        json!({"id": "u1", "name": "Ada Lovelace", "email": "ada@example.com"})
    }

    fn order_json(id: &str, created_at: &str) -> Value {
        json!({
            "id": id,
            "items": [{"productId": "p1", "name": "Mug", "unitPrice": "10.00", "quantity": 1}],
            "total": "15.00",
            "status": "paid",
            "createdAt": created_at,
            "shippingAddress": {
                "fullName": "Ada Lovelace",
                "line1": "12 St James's Square",
                "city": "London",
                "postalCode": "SW1Y 4JH",
                "country": "GB"
            }
        })
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("authorization").and_then(|v| v.to_str().ok())
            == Some(&format!("Bearer {TOKEN}")[..])
    }

    fn accounts() -> Router {
        Router::new()
            .route(
                "/auth/login",
                post(|Json(body): Json<Value>| async move {
                    if body["password"] == "correct horse" {
                        Ok(Json(json!({"token": TOKEN, "user": user_json()})))
                    } else {
                        Err((StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid credentials"}))))
                    }
                }),
            )
            .route(
                "/auth/register",
                post(|| async {
                    (StatusCode::CONFLICT, Json(json!({"message": "Email already registered"})))
                }),
            )
            .route("/auth/forgot-password", post(|| async { StatusCode::NO_CONTENT }))
            .route(
                "/auth/reset-password",
                post(|| async {
                    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"message": "Reset link has expired"})))
                }),
            )
            .route(
                "/users/me",
                get(|headers: HeaderMap| async move {
                    if authorized(&headers) {
                        Ok(Json(user_json()))
                    } else {
                        Err(StatusCode::UNAUTHORIZED)
                    }
                })
                .put(|Json(body): Json<Value>| async move {
                    Json(json!({"id": "u1", "name": body["name"], "email": body["email"]}))
                }),
            )
            .route(
                "/users/me/password",
                put(|Json(body): Json<Value>| async move {
                    assert!(body.get("currentPassword").is_some());
                    assert!(body.get("newPassword").is_some());
                    StatusCode::NO_CONTENT
                }),
            )
            .route(
                "/orders",
                get(|| async {
                    Json(json!([
                        order_json("o1", "2026-01-01T10:00:00Z"),
                        order_json("o2", "2026-02-01T10:00:00Z")
                    ]))
                })
                .post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["cartId"], "c1");
                    Json(order_json("o3", "2026-03-01T10:00:00Z"))
                }),
            )
    }

    #[tokio::test]
    async fn test_login_returns_token_and_user() {
        let client = MockApi::spawn(accounts()).await.client();

        let session = client.login("ada@example.com", "correct horse").await.unwrap();
        assert_eq!(session.token.expose(), TOKEN);
        assert_eq!(session.user.greeting_name(), "Ada");

        let err = client.login("ada@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_register_conflict_carries_message() {
        let client = MockApi::spawn(accounts()).await.client();
        let err = client
            .register("Ada", "ada@example.com", "longenough")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(m) if m == "Email already registered"));
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let client = MockApi::spawn(accounts()).await.client();
        client.forgot_password("ada@example.com").await.unwrap();

        let err = client.reset_password("stale", "newpassword").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(m) if m == "Reset link has expired"));
    }

    #[tokio::test]
    async fn test_current_user_requires_valid_token() {
        let client = MockApi::spawn(accounts()).await.client();

        let user = client.current_user(&AccessToken::new(TOKEN)).await.unwrap();
        assert_eq!(user.email.as_str(), "ada@example.com");

        let err = client
            .current_user(&AccessToken::new("revoked"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_update_profile_and_password() {
        let client = MockApi::spawn(accounts()).await.client();
        let token = AccessToken::new(TOKEN);

        let user = client
            .update_profile(&token, "Ada King", "ada@example.org")
            .await
            .unwrap();
        assert_eq!(user.name, "Ada King");

        client
            .change_password(&token, "correct horse", "battery staple")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_orders_newest_first_and_place_order() {
        let client = MockApi::spawn(accounts()).await.client();
        let token = AccessToken::new(TOKEN);

        let orders = client.list_orders(&token).await.unwrap();
        let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["o2", "o1"]);

        let address = ShippingAddress {
            full_name: "Ada Lovelace".to_string(),
            line1: "12 St James's Square".to_string(),
            line2: None,
            city: "London".to_string(),
            postal_code: "SW1Y 4JH".to_string(),
            country: "GB".to_string(),
        };
        let order = client
            .place_order(&token, &CartId::new("c1"), &address)
            .await
            .unwrap();
        assert_eq!(order.id.as_str(), "o3");
    }
}
