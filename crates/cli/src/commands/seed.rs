//! Seed the catalog from a YAML file.
//!
//! # File Format
//!
//! ```yaml
//! - name: Taza de cerámica
//!   description: Taza esmaltada de 350 ml
//!   category: Cocina
//!   image_ref: taza.jpg
//!   price: "12.50"
//!   stock: 20
//! ```
//!
//! `description`, `category` and `image_ref` may be omitted. The whole file is
//! validated before anything is written, and all products are inserted in
//! one transaction.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use tienda_core::Price;
use tienda_storefront::db::{RepositoryError, products};
use tienda_storefront::models::NewProduct;

use super::{CommandError, connect};

/// One product entry in the seed file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_ref: String,
    pub price: Decimal,
    pub stock: i32,
}

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} invalid product(s) in file")]
    Invalid(usize),

    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for SeedError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Validate every entry, returning the products or one message per bad entry.
///
/// # Errors
///
/// Returns the messages of all invalid entries, numbered from 1.
pub fn validate(entries: &[SeedProduct]) -> Result<Vec<NewProduct>, Vec<String>> {
    let mut products = Vec::with_capacity(entries.len());
    let mut errors = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        let product = Price::new(entry.price)
            .map_err(|e| e.to_string())
            .and_then(|price| {
                NewProduct::new(
                    &entry.name,
                    &entry.description,
                    &entry.category,
                    &entry.image_ref,
                    price,
                    entry.stock,
                )
                .map_err(|e| e.to_string())
            });

        match product {
            Ok(product) => products.push(product),
            Err(message) => errors.push(format!("#{} ({}): {message}", index + 1, entry.name)),
        }
    }

    if errors.is_empty() {
        Ok(products)
    } else {
        Err(errors)
    }
}

/// Seed products from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML file
/// * `clear_existing` - If true, delete the current catalog first
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or a database operation fails. Nothing is written on error.
pub async fn products(file_path: &str, clear_existing: bool) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }

    info!(path = %file_path, "Loading products from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let entries: Vec<SeedProduct> = serde_yaml::from_str(&content)?;

    info!(products = entries.len(), "Parsed file");

    let new_products = validate(&entries).map_err(|errors| {
        error!("Validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        SeedError::Invalid(errors.len())
    })?;

    let pool = connect().await?;
    let mut tx = pool.begin().await?;

    if clear_existing {
        let removed = products::delete_all(&mut *tx).await?;
        info!(removed, "Cleared existing catalog");
    }

    for product in &new_products {
        let created = products::insert(&mut *tx, product).await?;
        info!(product_id = %created.id, name = %created.name, "Inserted product");
    }

    tx.commit().await?;

    info!("Seeding complete!");
    info!("  Products inserted: {}", new_products.len());
    Ok(())
}
