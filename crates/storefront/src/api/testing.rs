//! In-process stand-in for the catalog API used by client tests.

#![allow(clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use axum::Router;
use secrecy::SecretString;
use tokio::net::TcpListener;
use url::Url;

use super::ApiClient;
use crate::config::{CatalogApiConfig, ShopConfig, StorefrontConfig};
use crate::state::AppState;

pub const TEST_API_KEY: &str = "test-api-key";

/// A catalog API served from an axum router on an ephemeral port.
pub struct MockApi {
    base_url: Url,
}

impl MockApi {
    /// Serve `router` on `127.0.0.1:0` for the rest of the test.
    pub async fn spawn(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Self {
            base_url: Url::parse(&format!("http://{addr}/")).unwrap(),
        }
    }

    pub fn config(&self) -> CatalogApiConfig {
        CatalogApiConfig {
            base_url: self.base_url.clone(),
            api_key: SecretString::from(TEST_API_KEY),
            timeout: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(60),
        }
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.config()).unwrap()
    }

    /// Application state wired to this mock. The pool never connects.
    pub fn state(&self) -> AppState {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/harbor_test"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            catalog: self.config(),
            shop: ShopConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/harbor_test")
            .unwrap();
        AppState::new(config, pool).unwrap()
    }
}
