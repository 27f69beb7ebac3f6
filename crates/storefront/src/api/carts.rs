//! Cart endpoints. Carts are never cached.

use harbor_core::{Cart, CartId, ProductId};
use reqwest::Method;
use tracing::instrument;

use super::client::segment;
use super::types::{AddItemRequest, QuantityRequest};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Create a new, empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn create_cart(&self) -> Result<Cart, ApiError> {
        self.execute(self.request(Method::POST, "carts", None)?)
            .await
    }

    /// Get a cart by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart is not found or the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get_cart(&self, cart_id: &CartId) -> Result<Cart, ApiError> {
        self.execute(self.request(Method::GET, &cart_path(cart_id), None)?)
            .await
    }

    /// Add a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        let path = format!("{}/items", cart_path(cart_id));
        let request = self
            .request(Method::POST, &path, None)?
            .json(&AddItemRequest {
                product_id,
                quantity,
            });
        self.execute(request).await
    }

    /// Set the quantity of a line already in the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn update_cart_item(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        let request = self
            .request(Method::PUT, &item_path(cart_id, product_id), None)?
            .json(&QuantityRequest { quantity });
        self.execute(request).await
    }

    /// Remove a line from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn remove_cart_item(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
    ) -> Result<Cart, ApiError> {
        self.execute(self.request(Method::DELETE, &item_path(cart_id, product_id), None)?)
            .await
    }

    /// Remove every line from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn clear_cart(&self, cart_id: &CartId) -> Result<Cart, ApiError> {
        let path = format!("{}/items", cart_path(cart_id));
        self.execute(self.request(Method::DELETE, &path, None)?)
            .await
    }
}

fn cart_path(cart_id: &CartId) -> String {
    format!("carts/{}", segment(cart_id.as_str()))
}

fn item_path(cart_id: &CartId, product_id: &ProductId) -> String {
    format!(
        "{}/items/{}",
        cart_path(cart_id),
        segment(product_id.as_str())
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;

    use crate::api::testing::MockApi;

    /// Quantities per product, standing in for the API's cart storage.
    type Lines = Arc<Mutex<Vec<(String, u32)>>>;

    fn cart_json(id: &str, lines: &[(String, u32)]) -> Value {
        let items: Vec<Value> = lines
            .iter()
            .map(|(product_id, quantity)| {
                json!({
                    "product": {
                        "id": product_id,
                        "name": "Mug",
                        "price": "10.00",
                        "stock": 4,
                        "category": "mugs"
                    },
                    "quantity": quantity
                })
            })
            .collect();
        json!({ "id": id, "items": items })
    }

    fn carts(lines: Lines) -> Router {
        Router::new()
            .route("/carts", post(|| async { Json(json!({"id": "c1", "items": []})) }))
            .route(
                "/carts/{id}",
                get(|State(lines): State<Lines>, Path(id): Path<String>| async move {
                    if id != "c1" {
                        return Err(StatusCode::NOT_FOUND);
                    }
                    Ok(Json(cart_json(&id, &lines.lock().unwrap())))
                }),
            )
            .route(
                "/carts/{id}/items",
                post(
                    |State(lines): State<Lines>, Path(id): Path<String>, Json(body): Json<Value>| async move {
                        let product_id = body["productId"].as_str().unwrap().to_string();
                        let quantity = u32::try_from(body["quantity"].as_u64().unwrap()).unwrap();
                        lines.lock().unwrap().push((product_id, quantity));
                        Json(cart_json(&id, &lines.lock().unwrap()))
                    },
                )
                .delete(|State(lines): State<Lines>, Path(id): Path<String>| async move {
                    lines.lock().unwrap().clear();
                    Json(cart_json(&id, &[]))
                }),
            )
            .route(
                "/carts/{id}/items/{product_id}",
                put(
                    |State(lines): State<Lines>,
                     Path((id, product_id)): Path<(String, String)>,
                     Json(body): Json<Value>| async move {
                        let quantity = u32::try_from(body["quantity"].as_u64().unwrap()).unwrap();
                        for line in lines.lock().unwrap().iter_mut() {
                            if line.0 == product_id {
                                line.1 = quantity;
                            }
                        }
                        Json(cart_json(&id, &lines.lock().unwrap()))
                    },
                )
                .delete(
                    |State(lines): State<Lines>,
                     Path((id, product_id)): Path<(String, String)>| async move {
                        lines.lock().unwrap().retain(|line| line.0 != product_id);
                        Json(cart_json(&id, &lines.lock().unwrap()))
                    },
                ),
            )
            .with_state(lines)
    }

    #[tokio::test]
    async fn test_cart_lifecycle() {
        let client = MockApi::spawn(carts(Lines::default())).await.client();
        let mug = ProductId::new("p1");
        let print = ProductId::new("p2");

        let cart = client.create_cart().await.unwrap();
        assert!(cart.is_empty());

        client.add_to_cart(&cart.id, &mug, 2).await.unwrap();
        let cart = client.add_to_cart(&cart.id, &print, 1).await.unwrap();
        assert_eq!(cart.item_count(), 3);

        let cart = client.update_cart_item(&cart.id, &mug, 4).await.unwrap();
        assert_eq!(cart.item(&mug).map(|i| i.quantity), Some(4));

        let cart = client.remove_cart_item(&cart.id, &print).await.unwrap();
        assert!(cart.item(&print).is_none());
        assert_eq!(cart.item_count(), 4);

        let cart = client.get_cart(&cart.id).await.unwrap();
        assert_eq!(cart.item_count(), 4);

        let cart = client.clear_cart(&cart.id).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_cart_is_not_found() {
        let client = MockApi::spawn(carts(Lines::default())).await.client();
        let err = client.get_cart(&CartId::new("expired")).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_item_path_encodes_ids() {
        let path = item_path(&CartId::new("c 1"), &ProductId::new("p/2"));
        assert_eq!(path, "carts/c%201/items/p%2F2");
    }
}
