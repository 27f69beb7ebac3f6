//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//!
//! # Products
//! GET  /products               - Product listing (filters + pagination in the query)
//! GET  /products/{id}          - Product detail
//! GET  /products/{id}/quick-view - Quick view fragment (HTMX)
//!
//! # Cart (HTMX fragments, redirects for plain forms)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns "added" fragment, triggers cart-updated)
//! POST /cart/update            - Set quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove line (returns cart_items fragment)
//! POST /cart/clear             - Empty cart (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout (requires auth)
//! GET  /checkout               - Shipping form
//! POST /checkout               - Place order
//! GET  /checkout/complete/{id} - Confirmation
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! GET  /auth/forgot-password   - Request reset email
//! POST /auth/forgot-password   - Send reset email
//! GET  /auth/reset-password    - New password form (?token=)
//! POST /auth/reset-password    - Set new password
//! POST /auth/logout            - Logout action
//!
//! # Account (requires auth)
//! GET  /account                - Profile overview + recent orders
//! GET  /account/edit           - Edit name and email
//! POST /account/edit
//! GET  /account/password       - Change password
//! POST /account/password
//! GET  /account/orders         - Order history
//! GET  /account/orders/{id}    - Order detail
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod layout;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, cart_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
///
/// Form submissions are rate limited; the pages themselves are not.
pub fn auth_routes() -> Router<AppState> {
    let pages = Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/forgot-password", get(auth::forgot_password_page))
        .route("/reset-password", get(auth::reset_password_page));

    let actions = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route_layer(auth_rate_limiter());

    pages
        .merge(actions)
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/quick-view", get(products::quick_view))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    let mutations = Router::new()
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route_layer(cart_rate_limiter());

    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .merge(mutations)
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::place))
        .route("/complete/{id}", get(checkout::complete))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/edit", get(account::edit_page).post(account::edit))
        .route(
            "/password",
            get(account::password_page).post(account::change_password),
        )
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Body;
    use axum::extract::Path;
    use axum::routing::{delete, put};
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use axum::{Json, middleware::from_fn};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;
    use crate::api::testing::MockApi;
    use crate::middleware::csp_nonce_middleware;

    fn product_json(id: &str, name: &str, stock: u32) -> Value {
        json!({
            "id": id,
            "name": name,
            "description": "A very good thing.",
            "price": "12.00",
            "stock": stock,
            "category": "mugs"
        })
    }

    fn catalog() -> axum::Router {
        axum::Router::new()
            .route(
                "/products",
                get(|| async {
                    Json(json!({
                        "products": [product_json("p1", "Enamel Mug", 3)],
                        "page": 1,
                        "totalPages": 1,
                        "total": 1
                    }))
                }),
            )
            .route(
                "/products/categories",
                get(|| async { Json(json!(["mugs", "prints"])) }),
            )
            .route(
                "/products/{id}",
                get(|Path(id): Path<String>| async move {
                    if id == "p1" {
                        Ok(Json(product_json("p1", "Enamel Mug", 3)))
                    } else {
                        Err((StatusCode::NOT_FOUND, Json(json!({"message": "No such product"}))))
                    }
                }),
            )
            .route("/carts", post(|| async { Json(json!({"id": "c1", "items": []})) }))
            .route(
                "/carts/{id}/items",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({
                        "id": "c1",
                        "items": [{
                            "product": product_json("p1", "Enamel Mug", 3),
                            "quantity": body["quantity"]
                        }]
                    }))
                }),
            )
            .route(
                "/auth/login",
                post(|| async {
                    (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid credentials"})))
                }),
            )
    }

    async fn app(api: axum::Router) -> axum::Router {
        let state = MockApi::spawn(api).await.state();
        routes()
            .layer(SessionManagerLayer::new(MemoryStore::default()))
            .layer(from_fn(csp_nonce_middleware))
            .with_state(state)
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_product_listing_renders_products_and_categories() {
        let response = app(catalog())
            .await
            .oneshot(Request::get("/products?category=mugs").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Enamel Mug"));
        assert!(body.contains("prints"));
        assert!(body.contains("/products/p1"));
    }

    #[tokio::test]
    async fn test_listing_shows_error_with_retry_link() {
        let failing = axum::Router::new()
            .route("/products", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route("/products/categories", get(|| async { Json(json!([])) }));

        let response = app(failing)
            .await
            .oneshot(Request::get("/products?search=mug").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("reach the store right now"));
        assert!(body.contains("/products?search=mug"));
    }

    #[tokio::test]
    async fn test_unknown_product_is_404() {
        let response = app(catalog())
            .await
            .oneshot(Request::get("/products/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_htmx_add_to_cart_returns_badge_and_trigger() {
        let response = app(catalog())
            .await
            .oneshot(
                Request::post("/cart/add")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .header("hx-request", "true")
                    .header("x-forwarded-for", "203.0.113.7")
                    .body(Body::from("product_id=p1&quantity=9"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("hx-trigger").unwrap(),
            "cart-updated"
        );
        // Clamped to the 3 units in stock
        let body = body_text(response).await;
        assert!(body.contains('3'));
    }

    #[tokio::test]
    async fn test_plain_add_to_cart_redirects() {
        let response = app(catalog())
            .await
            .oneshot(
                Request::post("/cart/add")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .header("x-forwarded-for", "203.0.113.7")
                    .body(Body::from("product_id=p1"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/cart");
    }

    #[tokio::test]
    async fn test_checkout_requires_login() {
        let response = app(catalog())
            .await
            .oneshot(Request::get("/checkout").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login?next=%2Fcheckout");
    }

    #[tokio::test]
    async fn test_bad_login_redirects_with_error_and_next() {
        let response = app(catalog())
            .await
            .oneshot(
                Request::post("/auth/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .header("x-forwarded-for", "203.0.113.8")
                    .body(Body::from("email=ada%40example.com&password=nope&next=%2Fcheckout"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            "/auth/login?error=credentials&next=%2Fcheckout"
        );
    }

    #[tokio::test]
    async fn test_reset_page_without_token_redirects() {
        let response = app(catalog())
            .await
            .oneshot(Request::get("/auth/reset-password").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            "/auth/forgot-password?error=invalid_reset_link"
        );
    }

    // =========================================================================
    // Signed-in flows
    // =========================================================================

    /// Drives the app across requests, carrying the session cookie along.
    struct Browser {
        app: axum::Router,
        cookie: Option<String>,
    }

    impl Browser {
        async fn new(api: axum::Router) -> Self {
            Self {
                app: app(api).await,
                cookie: None,
            }
        }

        async fn send(&mut self, mut request: Request<Body>) -> Response {
            if let Some(cookie) = &self.cookie {
                request
                    .headers_mut()
                    .insert(header::COOKIE, cookie.parse().unwrap());
            }
            let response = self.app.clone().oneshot(request).await.unwrap();
            if let Some(set) = response.headers().get(header::SET_COOKIE) {
                let pair = set.to_str().unwrap().split(';').next().unwrap();
                self.cookie = Some(pair.to_string());
            }
            response
        }

        async fn get(&mut self, uri: &str) -> Response {
            self.send(Request::get(uri).body(Body::empty()).unwrap()).await
        }

        async fn post_form(&mut self, uri: &str, body: &str, htmx: bool) -> Response {
            let mut request = Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header("x-forwarded-for", "203.0.113.9");
            if htmx {
                request = request.header("hx-request", "true");
            }
            self.send(request.body(Body::from(body.to_string())).unwrap())
                .await
        }

        async fn sign_in(&mut self) {
            let response = self
                .post_form("/auth/login", "email=ada%40example.com&password=secret123", false)
                .await;
            assert_eq!(location(&response), "/account");
        }
    }

    fn cart_json(name: &str, quantity: u32) -> Value {
        json!({
            "id": "c1",
            "items": [{"product": product_json("p1", name, 3), "quantity": quantity}]
        })
    }

    fn shop_api() -> axum::Router {
        axum::Router::new()
            .route(
                "/products/{id}",
                get(|| async { Json(product_json("p1", "Enamel Mug", 3)) }),
            )
            .route("/carts", post(|| async { Json(json!({"id": "c1", "items": []})) }))
            .route(
                "/carts/{id}/items",
                post(|Json(body): Json<Value>| async move {
                    let quantity = u32::try_from(body["quantity"].as_u64().unwrap()).unwrap();
                    Json(cart_json("Enamel Mug", quantity))
                }),
            )
            .route(
                "/auth/login",
                post(|| async {
                    Json(json!({
                        "token": "tok-1",
                        "user": {"id": "u1", "name": "Ada Lovelace", "email": "ada@example.com"}
                    }))
                }),
            )
    }

    fn unauthorized() -> (StatusCode, Json<Value>) {
        (StatusCode::UNAUTHORIZED, Json(json!({"message": "Token expired"})))
    }

    #[tokio::test]
    async fn test_rejected_token_signs_out_and_returns_after_login() {
        let api = shop_api()
            .route("/users/me", get(|| async { unauthorized() }))
            .route("/orders", get(|| async { unauthorized() }));
        let mut browser = Browser::new(api).await;
        browser.sign_in().await;

        let response = browser.get("/account").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            "/auth/login?next=%2Faccount&error=session_expired"
        );

        // The signed-in user is gone
        let response = browser.get("/checkout").await;
        assert_eq!(location(&response), "/auth/login?next=%2Fcheckout");
    }

    #[tokio::test]
    async fn test_nested_account_pages_keep_full_next() {
        let mut browser = Browser::new(shop_api()).await;

        let response = browser.get("/account/orders").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login?next=%2Faccount%2Forders");
    }

    #[tokio::test]
    async fn test_checkout_places_order_and_drops_cart() {
        let api = shop_api()
            .route("/carts/{id}", get(|| async { Json(cart_json("Enamel Mug", 2)) }))
            .route(
                "/orders",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["cartId"], "c1");
                    Json(json!({
                        "id": "o1",
                        "items": [{
                            "productId": "p1",
                            "name": "Enamel Mug",
                            "unitPrice": "12.00",
                            "quantity": 2
                        }],
                        "total": "24.00",
                        "status": "paid",
                        "createdAt": "2026-01-05T10:00:00Z",
                        "shippingAddress": body["shippingAddress"]
                    }))
                }),
            );
        let mut browser = Browser::new(api).await;

        let response = browser.post_form("/cart/add", "product_id=p1&quantity=2", false).await;
        assert_eq!(location(&response), "/cart");
        browser.sign_in().await;

        let response = browser
            .post_form(
                "/checkout",
                "full_name=Ada+Lovelace&line1=1+Quay+St&line2=&city=Bristol\
                 &postal_code=BS1+4DJ&country=GB",
                false,
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/checkout/complete/o1");

        let response = browser.get("/cart/count").await;
        assert_eq!(body_text(response).await.trim(), "");
    }

    #[tokio::test]
    async fn test_stepper_clamps_to_stock_and_zero_removes() {
        let api = shop_api()
            .route("/carts/{id}", get(|| async { Json(cart_json("Enamel Mug", 1)) }))
            .route(
                "/carts/{id}/items/{product}",
                put(|Json(body): Json<Value>| async move {
                    let quantity = u32::try_from(body["quantity"].as_u64().unwrap()).unwrap();
                    Json(cart_json(&format!("Mug x{quantity}"), quantity))
                })
                .delete(|| async { Json(json!({"id": "c1", "items": []})) }),
            );
        let mut browser = Browser::new(api).await;
        browser.post_form("/cart/add", "product_id=p1", false).await;

        let response = browser
            .post_form("/cart/update", "product_id=p1&quantity=9", true)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Mug x3"));

        let response = browser
            .post_form("/cart/update", "product_id=p1&quantity=0", true)
            .await;
        assert!(body_text(response).await.contains("Your cart is empty"));
    }

    #[tokio::test]
    async fn test_clearing_expired_cart_forgets_it() {
        let clears = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&clears);
        let api = shop_api()
            .route(
                "/carts/{id}",
                get(|| async { (StatusCode::NOT_FOUND, Json(json!({"message": "No such cart"}))) }),
            )
            .route(
                "/carts/{id}/items",
                delete(move || {
                    let hits = Arc::clone(&hits);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        (StatusCode::NOT_FOUND, Json(json!({"message": "No such cart"})))
                    }
                }),
            );
        let mut browser = Browser::new(api).await;
        browser.post_form("/cart/add", "product_id=p1", false).await;

        let first = browser.post_form("/cart/clear", "", true).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers().get("hx-trigger").unwrap(), "cart-updated");
        assert!(body_text(first).await.contains("Your cart is empty"));

        let second = browser.post_form("/cart/clear", "", true).await;
        assert_eq!(second.status(), StatusCode::OK);
        assert!(body_text(second).await.contains("Your cart is empty"));

        assert_eq!(clears.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_account_updates_report_outage() {
        let api = shop_api()
            .route(
                "/users/me",
                put(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
            )
            .route(
                "/users/me/password",
                put(|| async { StatusCode::SERVICE_UNAVAILABLE }),
            );
        let mut browser = Browser::new(api).await;
        browser.sign_in().await;

        let response = browser
            .post_form("/account/edit", "name=Ada&email=ada%40example.com", false)
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/account/edit?error=unavailable");

        let response = browser
            .post_form(
                "/account/password",
                "current_password=secret123&password=longer-secret&password_confirm=longer-secret",
                false,
            )
            .await;
        assert_eq!(location(&response), "/account/password?error=unavailable");
    }
}
