//! Cache types for catalog API responses.

use harbor_core::{Page, Product, ProductId};

/// Cache key for products, product lists, and categories.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    /// Keyed by the normalized filter's query string.
    Products(String),
    Categories,
}

impl CacheKey {
    /// Whether this entry holds a product listing.
    pub const fn is_listing(&self) -> bool {
        matches!(self, Self::Products(_))
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Page<Product>),
    Categories(Vec<String>),
}
