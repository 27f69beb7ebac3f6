//! Catalog product commands.
//!
//! # Usage
//!
//! ```bash
//! harbor-cli products list --category mugs --page 2
//! harbor-cli products import catalog.yaml
//! harbor-cli products delete p-123
//! ```
//!
//! # Environment Variables
//!
//! - `CATALOG_API_URL` - Catalog API base URL
//! - `CATALOG_API_KEY` - Storefront API key
//! - `CATALOG_ADMIN_TOKEN` - Admin bearer token (import and delete only)
//!
//! # Import File Format
//!
//! ```yaml
//! - name: Enamel Mug
//!   description: Speckled blue, 350 ml.
//!   price: "18.00"
//!   promoPrice: "14.50"
//!   stock: 40
//!   category: mugs
//! ```

use std::path::Path;

use thiserror::Error;
use tracing::{error, info};

use harbor_core::{ProductFilter, ProductId, ProductInput};
use harbor_storefront::api::{AccessToken, ApiClient, ApiError};
use harbor_storefront::config::{CatalogApiConfig, ConfigError, get_validated_secret};

/// Errors that can occur during product commands.
#[derive(Debug, Error)]
pub enum ProductsError {
    /// Missing or invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Catalog API call failed.
    #[error("Catalog API error: {0}")]
    Api(#[from] ApiError),

    /// Import file could not be read.
    #[error("Could not read {0}: {1}")]
    Read(String, std::io::Error),

    /// Import file is not a YAML list of products.
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// One or more products failed validation.
    #[error("{0} validation errors found")]
    Invalid(usize),
}

/// List one page of products.
///
/// # Errors
///
/// Returns an error if configuration is missing or the API call fails.
pub async fn list(category: Option<String>, page: u32) -> Result<(), ProductsError> {
    dotenvy::dotenv().ok();
    let client = ApiClient::new(&CatalogApiConfig::from_env()?)?;

    let filter = ProductFilter {
        category,
        page,
        ..ProductFilter::default()
    }
    .normalized();

    let products = client.list_products(&filter).await?;

    info!(
        "Page {} of {} ({} products)",
        products.page, products.total_pages, products.total
    );
    for product in &products.items {
        info!(
            "  {}  {}  [{}]  {}  stock {}",
            product.id,
            product.name,
            product.category,
            product.effective_price(),
            product.stock
        );
    }

    Ok(())
}

/// Create every product in a YAML file.
///
/// The whole file is validated before the first API call, so a bad entry
/// never leaves a half-imported catalog behind.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, configuration is
/// missing, or an API call fails. Products created before a failing call
/// are kept.
pub async fn import(file_path: &str) -> Result<(), ProductsError> {
    dotenvy::dotenv().ok();

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(Path::new(file_path))
        .await
        .map_err(|e| ProductsError::Read(file_path.to_string(), e))?;

    let inputs = parse_products(&content)?;
    let problems = validate_products(&inputs);
    if !problems.is_empty() {
        error!("Product validation failed:");
        for problem in &problems {
            error!("  - {problem}");
        }
        return Err(ProductsError::Invalid(problems.len()));
    }
    info!(products = inputs.len(), "File validated successfully");

    let client = ApiClient::new(&CatalogApiConfig::from_env()?)?;
    let token = admin_token()?;

    for input in &inputs {
        let product = client.create_product(&token, input).await?;
        info!("  created {} ({})", product.id, product.name);
    }

    info!("Import complete: {} products created", inputs.len());
    Ok(())
}

/// Delete a product by ID.
///
/// # Errors
///
/// Returns an error if configuration is missing or the API call fails.
pub async fn delete(id: &str) -> Result<(), ProductsError> {
    dotenvy::dotenv().ok();
    let client = ApiClient::new(&CatalogApiConfig::from_env()?)?;
    let token = admin_token()?;

    let id = ProductId::new(id);
    client.delete_product(&token, &id).await?;

    info!("Deleted product {id}");
    Ok(())
}

fn admin_token() -> Result<AccessToken, ConfigError> {
    use secrecy::ExposeSecret;

    let secret = get_validated_secret("CATALOG_ADMIN_TOKEN")?;
    Ok(AccessToken::new(secret.expose_secret()))
}

/// Parse a YAML list of products.
fn parse_products(content: &str) -> Result<Vec<ProductInput>, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Validation problems for every entry, prefixed with the entry's position.
fn validate_products(inputs: &[ProductInput]) -> Vec<String> {
    inputs
        .iter()
        .enumerate()
        .flat_map(|(i, input)| {
            let label = if input.name.trim().is_empty() {
                format!("#{}", i + 1)
            } else {
                format!("#{} ({})", i + 1, input.name.trim())
            };
            input
                .validate()
                .into_iter()
                .map(move |problem| format!("{label}: {problem}"))
        })
        .collect()
}
