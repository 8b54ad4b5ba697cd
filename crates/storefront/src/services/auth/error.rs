//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] tienda_core::EmailError),

    /// Display name missing or too long.
    #[error("invalid name: {0}")]
    InvalidName(&'static str),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("duplicate email")]
    DuplicateEmail,

    /// Password does not satisfy the policy; every violated rule is listed.
    #[error("password validation failed: {}", .0.join("; "))]
    WeakPassword(Vec<&'static str>),

    /// Password and confirmation differ.
    #[error("password confirmation does not match")]
    PasswordMismatch,

    /// Reset token unknown, expired or already used.
    #[error("invalid or expired reset token")]
    InvalidResetToken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message safe to show to the person filling the form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "El correo electrónico no es válido.".to_owned(),
            Self::InvalidName(reason) => format!("Nombre no válido: {reason}."),
            Self::InvalidCredentials => "Correo o contraseña incorrectos.".to_owned(),
            Self::DuplicateEmail => "Ya existe una cuenta con ese correo.".to_owned(),
            Self::WeakPassword(rules) => format!("La contraseña debe {}.", rules.join(", ")),
            Self::PasswordMismatch => "Las contraseñas no coinciden.".to_owned(),
            Self::InvalidResetToken => {
                "El enlace de recuperación no es válido o ha caducado.".to_owned()
            }
            Self::Repository(_) | Self::PasswordHash => {
                "Error interno, inténtalo de nuevo más tarde.".to_owned()
            }
        }
    }
}
