//! Catalog REST API client.
//!
//! # Architecture
//!
//! - The catalog API is the source of truth - NO local sync, direct calls
//! - JSON over `reqwest`; every request carries the storefront `X-Api-Key`
//! - Authenticated calls add `Authorization: Bearer <token>` from the session
//! - Product lists, single products, and categories are cached via `moka`
//!
//! # Example
//!
//! ```rust,ignore
//! use harbor_core::ProductFilter;
//! use harbor_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.catalog)?;
//!
//! let page = client.list_products(&ProductFilter::default()).await?;
//! let cart = client.create_cart().await?;
//! let cart = client.add_to_cart(&cart.id, &page.items[0].id, 1).await?;
//! ```

mod account;
mod cache;
mod carts;
mod client;
mod products;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

pub use client::{API_KEY_HEADER, ApiClient};
pub use types::{AccessToken, AuthSession};

use thiserror::Error;

/// Errors that can occur when calling the catalog API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The bearer token is missing, expired, or rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request conflicts with existing state (e.g., email already registered).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The API rejected the input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Message suitable for showing inline on a page.
    ///
    /// Validation and conflict messages come from the API and are shown as-is;
    /// everything else is summarized without internal detail.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Conflict(message) => message.clone(),
            Self::NotFound(_) => "We couldn't find what you were looking for.".to_string(),
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            Self::RateLimited(secs) => {
                format!("We're receiving a lot of requests. Please try again in {secs} seconds.")
            }
            Self::Http(e) if e.is_timeout() => {
                "The store took too long to respond. Please try again.".to_string()
            }
            Self::Http(_) | Self::InvalidUrl(_) | Self::Status { .. } | Self::Parse(_) => {
                "We couldn't reach the store right now. Please try again.".to_string()
            }
        }
    }

    /// Whether this error indicates a server-side or transport fault worth reporting.
    #[must_use]
    pub const fn is_server_fault(&self) -> bool {
        match self {
            Self::Http(_) | Self::InvalidUrl(_) | Self::Parse(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
