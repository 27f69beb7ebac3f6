//! Harbor CLI - Session table migration and catalog management.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table used by the storefront
//! harbor-cli migrate
//!
//! # Browse the catalog as the storefront sees it
//! harbor-cli products list --category mugs --page 2
//!
//! # Create products from a YAML file
//! harbor-cli products import catalog.yaml
//!
//! # Delete a product
//! harbor-cli products delete p-123
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create the `tower_sessions` schema and table
//! - `products list` - List one page of products
//! - `products import` - Validate and create products from YAML
//! - `products delete` - Delete a product by ID

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "harbor-cli")]
#[command(author, version, about = "Harbor storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the session table in the storefront database
    Migrate,
    /// Manage catalog products through the catalog API
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List one page of products
    List {
        /// Only show products in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Create products from a YAML file
    Import {
        /// Path to a YAML list of products
        file: String,
    },
    /// Delete a product
    Delete {
        /// Product ID
        id: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::sessions().await?,
        Commands::Products { action } => match action {
            ProductAction::List { category, page } => {
                commands::products::list(category, page).await?;
            }
            ProductAction::Import { file } => commands::products::import(&file).await?,
            ProductAction::Delete { id } => commands::products::delete(&id).await?,
        },
    }
    Ok(())
}
