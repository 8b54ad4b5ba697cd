//! Application state shared across handlers.

use std::sync::Arc;

use lettre::transport::smtp::Error as SmtpError;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::{EmailService, ReceiptStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    receipts: ReceiptStore,
    email: Option<EmailService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if SMTP is configured but the relay cannot be set up.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, SmtpError> {
        let receipts = ReceiptStore::new(config.receipts_dir.clone());
        let email = config.email.as_ref().map(EmailService::new).transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                receipts,
                email,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Where receipt PDFs live.
    #[must_use]
    pub fn receipts(&self) -> &ReceiptStore {
        &self.inner.receipts
    }

    /// Outgoing mail, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }
}
