//! Session-related types.
//!
//! Types stored in the session for authentication state and flash messages.

use serde::{Deserialize, Serialize};

use tienda_core::{Email, Role, UserId};

use super::user::User;

/// Session-stored user identity.
///
/// Only a cache for rendering; guards re-read the account from the database
/// on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address.
    pub email: Email,
    /// Access level at the time of the last refresh.
    pub role: Role,
}

impl CurrentUser {
    /// Whether this user may use the admin panel.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.has(Role::Administrator)
    }

    /// Where to send this user after login.
    #[must_use]
    pub const fn landing_path(&self) -> &'static str {
        if self.is_admin() {
            "/panel_admin"
        } else {
            "/catalogo"
        }
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    /// CSS class used by the layout template.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "flash-success",
            Self::Info => "flash-info",
            Self::Error => "flash-error",
        }
    }
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
    /// Optional download link rendered after the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
            link: None,
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
            link: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
            link: None,
        }
    }

    #[must_use]
    pub fn with_link(mut self, href: impl Into<String>) -> Self {
        self.link = Some(href.into());
        self
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the queue of pending flash messages.
    pub const FLASHES: &str = "flashes";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            name: "Ana".to_owned(),
            email: Email::parse("ana@example.com").unwrap(),
            role,
        }
    }

    #[test]
    fn test_landing_path_by_role() {
        assert_eq!(user(Role::Customer).landing_path(), "/catalogo");
        assert_eq!(user(Role::Administrator).landing_path(), "/panel_admin");
    }

    #[test]
    fn test_session_serde_roundtrip() {
        let current = user(Role::Administrator);
        let json = serde_json::to_value(&current).unwrap();
        assert_eq!(json["role"], "administrator");
        let back: CurrentUser = serde_json::from_value(json).unwrap();
        assert_eq!(back, current);
    }
}
