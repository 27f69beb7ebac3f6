//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (session store)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `CATALOG_API_URL` - Base URL of the catalog REST API
//! - `CATALOG_API_KEY` - Storefront key sent as `X-Api-Key` (high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `CATALOG_API_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `CATALOG_CACHE_TTL_SECS` - Product cache lifetime (default: 60)
//! - `STORE_NAME` - Display name (default: Harbor Goods)
//! - `STORE_CURRENCY` - ISO 4217 code for price display (default: USD)
//! - `SHIPPING_FLAT_RATE` - Shipping charged per order (default: 5.00)
//! - `SHIPPING_FREE_OVER` - Free shipping threshold, empty to disable (default: 50.00)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use harbor_core::{CurrencyCode, ShippingPolicy};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Catalog API connection settings
    pub catalog: CatalogApiConfig,
    /// Store display and shipping settings
    pub shop: ShopConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Catalog API connection settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct CatalogApiConfig {
    /// Base URL, always ending in `/` so relative paths join beneath it
    pub base_url: Url,
    /// Storefront API key
    pub api_key: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
    /// Lifetime of cached product data
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for CatalogApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

/// Store display and shipping settings.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// Store name shown in the header and page titles
    pub name: String,
    /// Currency used for price display
    pub currency: CurrencyCode,
    /// Shipping rules for the cart summary
    pub shipping: ShippingPolicy,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            name: "Harbor Goods".to_string(),
            currency: CurrencyCode::USD,
            shipping: ShippingPolicy::default(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        let catalog = CatalogApiConfig::from_env()?;
        let shop = ShopConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            catalog,
            shop,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default::<f32>("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default::<f32>(
                "SENTRY_TRACES_SAMPLE_RATE",
                "0.0",
            )?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl CatalogApiConfig {
    /// Load catalog API settings from the environment.
    ///
    /// Shared with the CLI, which talks to the same API.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL or key is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(&get_required_env("CATALOG_API_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("CATALOG_API_URL".to_string(), e))?;

        Ok(Self {
            base_url,
            api_key: get_validated_secret("CATALOG_API_KEY")?,
            timeout: Duration::from_secs(parse_env_or_default::<u64>(
                "CATALOG_API_TIMEOUT_SECS",
                "10",
            )?),
            cache_ttl: Duration::from_secs(parse_env_or_default::<u64>(
                "CATALOG_CACHE_TTL_SECS",
                "60",
            )?),
        })
    }
}

impl ShopConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let currency = get_optional_env("STORE_CURRENCY")
            .map(|code| {
                code.parse::<CurrencyCode>()
                    .map_err(|e| ConfigError::InvalidEnvVar("STORE_CURRENCY".to_string(), e))
            })
            .transpose()?
            .unwrap_or(defaults.currency);

        let flat_rate = parse_env_or_default::<Decimal>("SHIPPING_FLAT_RATE", "5.00")?;
        // Present-but-empty disables the threshold
        let free_over = match std::env::var("SHIPPING_FREE_OVER") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(parse_value::<Decimal>("SHIPPING_FREE_OVER", &value)?),
            Err(_) => defaults.shipping.free_over,
        };

        Ok(Self {
            name: get_optional_env("STORE_NAME").unwrap_or(defaults.name),
            currency,
            shipping: ShippingPolicy {
                flat_rate,
                free_over,
            },
        })
    }
}

/// Parse a base URL and make sure its path ends in `/`.
///
/// `Url::join` replaces the last path segment unless the base ends with a slash,
/// so `https://api.example.com/v1` must become `https://api.example.com/v1/`.
fn normalize_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme: {}", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` naming `primary_key` if neither is set.
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a raw value, naming the variable in the error.
fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse an environment variable, falling back to a default literal.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = get_optional_env(key).unwrap_or_else(|| default.to_string());
    parse_value(key, &value)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
///
/// # Errors
///
/// Returns `ConfigError` if the variable is missing, looks like a placeholder,
/// or has too little entropy.
pub fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        // Random-looking string should have high entropy
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_changeme() {
        let result = validate_secret_strength("changeme123", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_normalize_base_url_appends_slash() {
        let url = normalize_base_url("https://api.harbor.test/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.harbor.test/v1/");
        assert_eq!(
            url.join("products/42").unwrap().as_str(),
            "https://api.harbor.test/v1/products/42"
        );
    }

    #[test]
    fn test_normalize_base_url_keeps_existing_slash() {
        let url = normalize_base_url("http://localhost:4000/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/");
    }

    #[test]
    fn test_normalize_base_url_rejects_other_schemes() {
        assert!(normalize_base_url("ftp://api.harbor.test").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_parse_value_reports_key() {
        let err = parse_value::<u16>("STOREFRONT_PORT", "http").unwrap_err();
        assert!(err.to_string().contains("STOREFRONT_PORT"));
        assert_eq!(parse_value::<Decimal>("SHIPPING_FLAT_RATE", " 4.50 ").unwrap(), Decimal::new(450, 2));
    }

    fn catalog_config() -> CatalogApiConfig {
        CatalogApiConfig {
            base_url: Url::parse("https://api.harbor.test/").unwrap(),
            api_key: SecretString::from("k9$Fq2!vLz7@Rw4#"),
            timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            catalog: catalog_config(),
            shop: ShopConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_https());
    }

    #[test]
    fn test_catalog_config_debug_redacts_key() {
        let debug_output = format!("{:?}", catalog_config());

        assert!(debug_output.contains("api.harbor.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("k9$Fq2"));
    }
}
