//! Role and status enums.

use serde::{Deserialize, Serialize};

/// Access level of a user account.
///
/// Every account is created as [`Role::Customer`]. Promotion to
/// [`Role::Administrator`] only happens through the operator CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Browses the catalog, fills a cart and places orders.
    #[default]
    Customer,
    /// Manages the catalog and reviews every order.
    Administrator,
}

impl Role {
    /// Whether this role grants at least the privileges of `required`.
    #[must_use]
    pub const fn has(self, required: Self) -> bool {
        match required {
            Self::Customer => true,
            Self::Administrator => matches!(self, Self::Administrator),
        }
    }

    /// Human-readable label for the UI.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Customer => "Cliente",
            Self::Administrator => "Administrador",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Administrator => write!(f, "administrator"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "administrator" => Ok(Self::Administrator),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Lifecycle status of an order.
///
/// Checkout is the only way to create an order and it completes the order
/// immediately, so `Completed` is the only state today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Completed,
}

impl OrderStatus {
    /// Human-readable label for the UI.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Completed => "completado",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_has() {
        assert!(Role::Administrator.has(Role::Administrator));
        assert!(Role::Administrator.has(Role::Customer));
        assert!(Role::Customer.has(Role::Customer));
        assert!(!Role::Customer.has(Role::Administrator));
    }

    #[test]
    fn test_role_default_is_customer() {
        assert_eq!(Role::default(), Role::Customer);
    }

    #[test]
    fn test_role_string_roundtrip() {
        for role in [Role::Customer, Role::Administrator] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
        assert!("Administrador".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(
            serde_json::to_string(&Role::Administrator).unwrap(),
            "\"administrator\""
        );
    }

    #[test]
    fn test_order_status_display() {
        assert_eq!(OrderStatus::Completed.to_string(), "completed");
        assert_eq!(OrderStatus::Completed.label(), "completado");
    }
}
