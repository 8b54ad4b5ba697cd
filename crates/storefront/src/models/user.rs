//! User domain types.

use chrono::{DateTime, Utc};

use tienda_core::{Email, Role, UserId};

/// A storefront account (domain type).
///
/// Customers and administrators are the same entity; the [`Role`] decides
/// what the account may do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email (unique, normalized).
    pub email: Email,
    /// Access level.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Capability check used by the authorization guard.
    #[must_use]
    pub const fn has_role(&self, required: Role) -> bool {
        self.role.has(required)
    }
}
