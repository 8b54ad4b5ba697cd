//! Password reset token storage.
//!
//! Only the SHA-256 hex digest of a token is stored. A token is valid while
//! it is unused and not expired; consuming it and changing the password
//! happen in one transaction.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tienda_core::UserId;

use super::RepositoryError;

/// Repository for password reset tokens.
pub struct PasswordResetRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PasswordResetRepository<'a> {
    /// Create a new password reset repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new token digest for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (token_hash, user_id, expires_at) \
             VALUES ($1, $2, $3)",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Owner of a token that can still be used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_valid(&self, token_hash: &str) -> Result<Option<UserId>, RepositoryError> {
        let user_id = sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM password_reset_tokens \
             WHERE token_hash = $1 AND used_at IS NULL AND expires_at > now()",
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(user_id)
    }

    /// Mark the token used and set the owner's password hash, atomically.
    /// Every other outstanding token of that user is invalidated too.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the token is unknown, used or expired.
    /// Returns `RepositoryError::Database` if any statement fails; nothing is written.
    pub async fn consume(
        &self,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<UserId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query_scalar::<_, UserId>(
            "UPDATE password_reset_tokens SET used_at = now() \
             WHERE token_hash = $1 AND used_at IS NULL AND expires_at > now() \
             RETURNING user_id",
        )
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE password_reset_tokens SET used_at = now() \
             WHERE user_id = $1 AND used_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user_id, "Password reset completed");
        Ok(user_id)
    }
}
