//! Session table migration.
//!
//! # Usage
//!
//! ```bash
//! harbor-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! The catalog API owns all business data, so the only local schema is the
//! `tower_sessions.session` table behind the storefront's session store.

use thiserror::Error;

use harbor_storefront::config::{ConfigError, get_database_url};
use harbor_storefront::db;
use harbor_storefront::middleware::session_store;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Missing or invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create the session schema and table if they don't exist.
///
/// Safe to run repeatedly.
///
/// # Errors
///
/// Returns an error if the database URL is missing or the DDL fails.
pub async fn sessions() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Creating session table...");
    session_store(&pool).migrate().await?;

    tracing::info!("Session table ready");
    Ok(())
}
