//! Authentication service.
//!
//! Password authentication, registration and token-based password reset.
//! Passwords are hashed with Argon2id; reset tokens are random 32-byte
//! values of which only the SHA-256 digest is persisted.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use tienda_core::{Email, Role, UserId};

use crate::db::{PasswordResetRepository, RepositoryError, UserRepository};
use crate::models::user::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum display name length.
const MAX_NAME_LENGTH: usize = 100;

/// How long a reset link stays valid.
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Authentication service.
///
/// Handles registration, login and password reset.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    resets: PasswordResetRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            resets: PasswordResetRepository::new(pool),
        }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidName` or `AuthError::InvalidEmail` for bad input.
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet the policy.
    /// Returns `AuthError::DuplicateEmail` if the email is already registered.
    #[tracing::instrument(skip(self, password, confirmation))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<User, AuthError> {
        self.create_account(name, email, password, confirmation, Role::Customer)
            .await
    }

    /// Create an administrator account (operator tooling).
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::register`].
    pub async fn create_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        self.create_account(name, email, password, password, Role::Administrator)
            .await
    }

    async fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirmation: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        let name = validate_name(name)?;
        let email = Email::parse(email)?;
        if password != confirmation {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(password)?;

        // Fast path for the common duplicate; the unique index still decides races
        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(name, &email, &password_hash, role)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::DuplicateEmail,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, role = %user.role, "Account created");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Issue a reset token for the account with this email.
    ///
    /// Returns `None` when no account matches, so callers can answer the same
    /// way in both cases. The returned token is the only copy of the secret.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the token cannot be stored.
    pub async fn create_reset_token(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        let Some(user) = self.users.get_by_email(&email).await? else {
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.resets
            .create(user.id, &hash_reset_token(&token), expires_at)
            .await?;

        tracing::info!(user_id = %user.id, "Password reset token issued");
        Ok(Some((user, token)))
    }

    /// Whether a reset token can still be used.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the lookup fails.
    pub async fn is_reset_token_valid(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self
            .resets
            .find_valid(&hash_reset_token(token))
            .await?
            .is_some())
    }

    /// Set a new password using a reset token. The token is consumed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` or `AuthError::WeakPassword` for bad input.
    /// Returns `AuthError::InvalidResetToken` if the token cannot be used.
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<UserId, AuthError> {
        if password != confirmation {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        self.resets
            .consume(&hash_reset_token(token), &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::InvalidResetToken,
                other => AuthError::Repository(other),
            })
    }
}

/// Trim and check a display name.
fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::InvalidName("el nombre es obligatorio"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::InvalidName("demasiado largo"));
    }
    Ok(name)
}

/// Validate password meets requirements.
///
/// Every violated rule is reported, not just the first.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` listing the violated rules.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let mut violations = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        violations.push("tener al menos 8 caracteres");
    }
    if !password.chars().any(char::is_uppercase) {
        violations.push("incluir una letra mayúscula");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push("incluir un número");
    }
    if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        violations.push("incluir un carácter especial");
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(AuthError::WeakPassword(violations))
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password does not match.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Generate a URL-safe reset token (64 hex characters).
fn generate_reset_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Digest stored in place of a reset token.
fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_accepts_strong() {
        assert!(validate_password("Segura#2026").is_ok());
    }

    #[test]
    fn test_validate_password_reports_all_violations() {
        let Err(AuthError::WeakPassword(rules)) = validate_password("abc") else {
            panic!("expected weak password");
        };
        assert_eq!(rules.len(), 4);
    }

    #[test]
    fn test_validate_password_single_violation() {
        let Err(AuthError::WeakPassword(rules)) = validate_password("Segura2026") else {
            panic!("expected weak password");
        };
        assert_eq!(rules, vec!["incluir un carácter especial"]);
    }

    #[test]
    fn test_validate_password_counts_chars_not_bytes() {
        // 7 characters, more than 8 bytes
        assert!(validate_password("Ñandú#1").is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Segura#2026").unwrap();
        assert_ne!(hash, "Segura#2026");
        assert!(verify_password("Segura#2026", &hash).is_ok());
        assert!(matches!(
            verify_password("Otra#2026", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("Segura#2026").unwrap();
        let b = hash_password("Segura#2026").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_reset_token_shape() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_reset_token());
    }

    #[test]
    fn test_reset_token_hash_is_stable_and_distinct() {
        let token = "abc";
        assert_eq!(hash_reset_token(token), hash_reset_token(token));
        assert_ne!(hash_reset_token(token), token);
        assert_eq!(hash_reset_token(token).len(), 64);
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Ana ").unwrap(), "Ana");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_weak_password_message_lists_rules() {
        let err = validate_password("abcdefgh").unwrap_err();
        let message = err.user_message();
        assert!(message.contains("mayúscula"));
        assert!(message.contains("número"));
    }
}
