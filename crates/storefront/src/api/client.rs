//! HTTP plumbing shared by every catalog API call.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::ApiError;
use super::cache::{CacheKey, CacheValue};
use super::types::{AccessToken, ErrorBody};
use crate::config::CatalogApiConfig;

/// Header carrying the storefront API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Maximum number of cached catalog entries.
const CACHE_CAPACITY: u64 = 1000;

/// Maximum characters of a response body written to logs or error messages.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the catalog REST API.
///
/// Cheap to clone; clones share the connection pool and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new catalog API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &CatalogApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("harbor-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.cache_ttl)
            .support_invalidation_closures()
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                api_key: config.api_key.expose_secret().to_string(),
                cache,
            }),
        })
    }

    /// Base URL all endpoints are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Start a request to `path` (relative to the base URL).
    ///
    /// Attaches the API key, and the bearer token when one is given.
    pub(super) fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&AccessToken>,
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.inner.base_url.join(path.trim_start_matches('/'))?;
        let mut request = self
            .inner
            .client
            .request(method, url)
            .header(API_KEY_HEADER, &self.inner.api_key)
            .header("Accept", "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token.expose());
        }
        Ok(request)
    }

    /// Send a request and decode its JSON body.
    pub(super) async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = Self::send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&body),
                "Failed to parse catalog API response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request whose response body is irrelevant.
    pub(super) async fn execute_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        Self::send(request).await.map(drop)
    }

    async fn send(request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(1);
            warn!(retry_after, "Catalog API rate limit hit");
            return Err(ApiError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            if status.is_server_error() {
                tracing::error!(
                    status = %status,
                    body = %truncate(&body),
                    "Catalog API returned server error"
                );
            } else {
                debug!(status = %status, body = %truncate(&body), "Catalog API rejected request");
            }
            return Err(status_error(status, &body));
        }

        Ok(body)
    }

    // =========================================================================
    // Cache
    // =========================================================================

    pub(super) async fn cached(&self, key: &CacheKey) -> Option<CacheValue> {
        self.inner.cache.get(key).await
    }

    pub(super) async fn cache(&self, key: CacheKey, value: CacheValue) {
        self.inner.cache.insert(key, value).await;
    }

    pub(super) async fn uncache(&self, key: &CacheKey) {
        self.inner.cache.invalidate(key).await;
    }

    /// Drop every cached product listing.
    pub(super) fn invalidate_listings(&self) {
        if let Err(e) = self
            .inner
            .cache
            .invalidate_entries_if(|key, _| key.is_listing())
        {
            // Fall back to clearing everything rather than serving stale lists
            warn!(error = %e, "Could not invalidate product listings, clearing cache");
            self.inner.cache.invalidate_all();
        }
    }

    /// Invalidate a cached product (and every listing that may contain it).
    pub async fn invalidate_product(&self, id: &harbor_core::ProductId) {
        self.uncache(&CacheKey::Product(id.clone())).await;
        self.invalidate_listings();
    }
}

/// Percent-encode a single path segment such as an ID.
pub(super) fn segment(raw: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(raw)
}

/// Map a non-success status and its body to an [`ApiError`].
///
/// The message comes from a JSON `message`/`error` field, else from a plain
/// text body (truncated), else from the status reason. HTML error pages
/// and JSON without a message never become the message.
fn status_error(status: StatusCode, body: &str) -> ApiError {
    let text = body.trim();
    let message = serde_json::from_str::<ErrorBody>(text)
        .ok()
        .and_then(ErrorBody::into_message)
        .or_else(|| {
            let plain = !text.is_empty() && !text.starts_with(['<', '{', '[']);
            plain.then(|| truncate(text))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::CONFLICT => ApiError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::Validation(message)
        }
        _ => ApiError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::testing::{MockApi, TEST_API_KEY};
    use axum::Json;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use serde_json::{Value, json};

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, r#"{"message": "no such product"}"#),
            ApiError::NotFound(m) if m == "no such product"
        ));
        assert!(matches!(
            status_error(StatusCode::CONFLICT, r#"{"error": "email taken"}"#),
            ApiError::Conflict(m) if m == "email taken"
        ));
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, "{}"),
            ApiError::Validation(m) if m == "Unprocessable Entity"
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "<html>oops</html>"),
            ApiError::Status { status: 502, message } if message == "Bad Gateway"
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "  quantity must be positive\n"),
            ApiError::Validation(m) if m == "quantity must be positive"
        ));
    }

    #[test]
    fn test_status_error_truncates_plain_body() {
        let body = "x".repeat(LOG_BODY_LIMIT + 50);
        let err = status_error(StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert!(matches!(
            err,
            ApiError::Status { status: 500, message } if message.len() == LOG_BODY_LIMIT
        ));
    }

    #[test]
    fn test_segment_encodes_reserved_characters() {
        assert_eq!(segment("abc-123"), "abc-123");
        assert_eq!(segment("a/b?c"), "a%2Fb%3Fc");
    }

    #[tokio::test]
    async fn test_request_sends_api_key_and_bearer() {
        async fn echo(headers: HeaderMap) -> Json<Value> {
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            Json(json!({
                "apiKey": header("x-api-key"),
                "authorization": header("authorization"),
            }))
        }

        let mock = MockApi::spawn(axum::Router::new().route("/echo", get(echo))).await;
        let client = mock.client();

        let token = AccessToken::new("tok_123");
        let request = client.request(Method::GET, "/echo", Some(&token)).unwrap();
        let body: Value = client.execute(request).await.unwrap();
        assert_eq!(body["apiKey"], TEST_API_KEY);
        assert_eq!(body["authorization"], "Bearer tok_123");

        let request = client.request(Method::GET, "echo", None).unwrap();
        let body: Value = client.execute(request).await.unwrap();
        assert!(body["authorization"].is_null());
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        async fn limited() -> impl IntoResponse {
            (AxumStatus::TOO_MANY_REQUESTS, [("Retry-After", "7")], "slow down")
        }
        async fn limited_without_header() -> impl IntoResponse {
            AxumStatus::TOO_MANY_REQUESTS
        }

        let mock = MockApi::spawn(
            axum::Router::new()
                .route("/limited", get(limited))
                .route("/bare", get(limited_without_header)),
        )
        .await;
        let client = mock.client();

        let request = client.request(Method::GET, "limited", None).unwrap();
        let err = client.execute::<Value>(request).await.unwrap_err();
        assert!(matches!(err, ApiError::RateLimited(7)));

        let request = client.request(Method::GET, "bare", None).unwrap();
        let err = client.execute::<Value>(request).await.unwrap_err();
        assert!(matches!(err, ApiError::RateLimited(1)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mock =
            MockApi::spawn(axum::Router::new().route("/bad", get(|| async { "not json" }))).await;
        let client = mock.client();

        let request = client.request(Method::GET, "bad", None).unwrap();
        let err = client.execute::<Value>(request).await.unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }
}
