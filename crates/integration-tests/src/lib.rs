//! Integration tests for the Harbor storefront.
//!
//! These tests drive a running storefront over HTTP, so they are `#[ignore]`d
//! by default.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the storefront (and the catalog API it points at)
//! cargo run -p harbor-storefront
//!
//! # Run integration tests against it
//! STOREFRONT_BASE_URL=http://127.0.0.1:3000 \
//!     cargo test -p harbor-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `health` - Liveness and readiness probes
//! - `browse` - Home, listing, filters, product detail
//! - `cart_flow` - Guest cart and the checkout login gate

use reqwest::{Client, redirect};

/// Storefront URL used when `STOREFRONT_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";

/// HTTP clients pointed at a running storefront.
pub struct TestContext {
    /// Follows redirects and keeps cookies, like a browser.
    pub client: Client,
    /// Keeps cookies but returns redirects as-is.
    pub no_redirect: Client,
    pub base_url: String,
}

impl TestContext {
    /// Build a context from the environment (`.env` is honored).
    ///
    /// # Panics
    ///
    /// Panics if an HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let _ = dotenvy::dotenv();
        let base_url = std::env::var("STOREFRONT_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("build client");
        let no_redirect = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("build client");

        Self {
            client,
            no_redirect,
            base_url,
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
