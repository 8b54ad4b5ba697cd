//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;

/// Errors shared by every command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the database named by `DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if the variable is unset or the connection fails.
pub async fn connect() -> Result<PgPool, CommandError> {
    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(tienda_storefront::db::create_pool(&database_url).await?)
}
