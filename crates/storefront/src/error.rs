//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, CartError, CheckoutError, ReceiptError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation refused or failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout refused or failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Receipt could not be produced.
    #[error("Receipt error: {0}")]
    Receipt(#[from] ReceiptError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the role does not allow this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this is the server's fault rather than the request's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Receipt(_)
                | Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
                | Self::Cart(CartError::Repository(_))
                | Self::Checkout(CheckoutError::Repository(_))
        )
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        if self.is_server_error() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::DuplicateEmail => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Cart(CartError::ProductNotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Cart(CartError::InsufficientStock { .. })
            | Self::Checkout(CheckoutError::InsufficientStock { .. }) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Text shown to the client. Never contains internal details.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.is_server_error() {
            return "Error interno del servidor".to_string();
        }
        match self {
            Self::Auth(err) => err.user_message(),
            Self::Cart(err) => err.user_message(),
            Self::Checkout(err) => err.user_message(),
            Self::NotFound(what) => format!("No encontrado: {what}"),
            Self::Unauthorized(_) => "Debes iniciar sesión.".to_string(),
            Self::Forbidden(_) => "No tienes permiso para acceder a esta página.".to_string(),
            Self::BadRequest(msg) => msg.clone(),
            _ => "Error interno del servidor".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if matches!(self, Self::Forbidden(_)) {
            tracing::warn!(error = %self, "Access denied");
        }

        (self.status(), self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("navigation", "Viewed product page", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_domain_error_status_codes() {
        assert_eq!(
            get_status(AppError::Cart(CartError::InsufficientStock {
                requested: 2,
                available: 1
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::DuplicateEmail)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let err = AppError::Internal("connection refused on 10.0.0.3".to_string());
        assert!(!err.public_message().contains("10.0.0.3"));

        let err = AppError::Database(RepositoryError::DataCorruption("bad row".to_string()));
        assert!(!err.public_message().contains("bad row"));
    }

    #[test]
    fn test_login_failure_message_does_not_reveal_account() {
        let err = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(err.public_message(), "Correo o contraseña incorrectos.");
    }
}
