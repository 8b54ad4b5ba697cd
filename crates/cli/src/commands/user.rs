//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! TIENDA_ADMIN_PASSWORD='...' tienda user create-admin -n "Ana Gómez" -e ana@example.com
//! tienda user promote -e luis@example.com
//! ```

use thiserror::Error;

use tienda_core::{Email, EmailError, Role};
use tienda_storefront::db::{RepositoryError, UserRepository};
use tienda_storefront::services::{AuthError, AuthService};

use super::{CommandError, connect};

/// Errors that can occur during user management.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("No user with email: {0}")]
    NotFound(String),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create an administrator account.
///
/// # Errors
///
/// Returns an error if the name, email or password is rejected, the email is
/// taken, or the database is unreachable.
pub async fn create_admin(name: &str, email: &str, password: &str) -> Result<(), UserError> {
    let pool = connect().await?;

    tracing::info!("Creating administrator: {}", email);
    let user = AuthService::new(&pool)
        .create_admin(name, email, password)
        .await?;

    tracing::info!(
        "Administrator created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(())
}

/// Give an existing account the administrator role.
///
/// # Errors
///
/// Returns an error if the email is malformed, no account has it, or the
/// database is unreachable.
pub async fn promote(email: &str) -> Result<(), UserError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_role(&email, Role::Administrator)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => UserError::NotFound(email.to_string()),
            other => UserError::Repository(other),
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, "User promoted to administrator");
    Ok(())
}
