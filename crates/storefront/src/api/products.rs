//! Product and category endpoints.

use harbor_core::{Page, Product, ProductFilter, ProductId, ProductInput};
use reqwest::Method;
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::client::segment;
use super::types::{AccessToken, ProductListResponse};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Get a page of products matching `filter`.
    ///
    /// The filter is normalized before it is sent, so equivalent filters share
    /// a cache entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, filter), fields(query = tracing::field::Empty))]
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>, ApiError> {
        let query = filter.to_query();
        let cache_key = CacheKey::Products(filter.cache_key());
        tracing::Span::current().record("query", filter.cache_key().as_str());

        if let Some(CacheValue::Products(page)) = self.cached(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let request = self.request(Method::GET, "products", None)?.query(&query);
        let response: ProductListResponse = self.execute(request).await?;
        let page = Page::from(response);

        self.cache(cache_key, CacheValue::Products(page.clone()))
            .await;

        Ok(page)
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(product)) = self.cached(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("products/{}", segment(id.as_str()));
        let product: Product = self
            .execute(self.request(Method::GET, &path, None)?)
            .await?;

        self.cache(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get every category name the catalog knows about.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<String>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.cached(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<String> = self
            .execute(self.request(Method::GET, "products/categories", None)?)
            .await?;

        self.cache(
            CacheKey::Categories,
            CacheValue::Categories(categories.clone()),
        )
        .await;

        Ok(categories)
    }

    /// Create a product. Requires an admin token.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the input or the request fails.
    #[instrument(skip(self, token, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        token: &AccessToken,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        let request = self
            .request(Method::POST, "products", Some(token))?
            .json(input);
        let product: Product = self.execute(request).await?;

        self.invalidate_listings();
        self.invalidate_categories().await;

        Ok(product)
    }

    /// Replace a product. Requires an admin token.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found, the input is rejected,
    /// or the request fails.
    #[instrument(skip(self, token, input), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        token: &AccessToken,
        id: &ProductId,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        let path = format!("products/{}", segment(id.as_str()));
        let request = self.request(Method::PUT, &path, Some(token))?.json(input);
        let product: Product = self.execute(request).await?;

        self.invalidate_product(id).await;
        self.invalidate_categories().await;

        Ok(product)
    }

    /// Delete a product. Requires an admin token.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the request fails.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn delete_product(&self, token: &AccessToken, id: &ProductId) -> Result<(), ApiError> {
        let path = format!("products/{}", segment(id.as_str()));
        self.execute_empty(self.request(Method::DELETE, &path, Some(token))?)
            .await?;

        self.invalidate_product(id).await;

        Ok(())
    }

    async fn invalidate_categories(&self) {
        self.uncache(&CacheKey::Categories).await;
    }
}
