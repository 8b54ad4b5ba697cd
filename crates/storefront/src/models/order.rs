//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use tienda_core::{Email, OrderId, OrderLineId, OrderStatus, ProductId, UserId};

use super::cart::LineItem;

/// An order header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    /// File name of the generated receipt, once written.
    pub receipt_file: Option<String>,
}

/// A line of an order.
///
/// Name and unit price are the values at checkout time. `product_id` is
/// `None` once the product has been deleted from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl LineItem for OrderLine {
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    fn quantity(&self) -> i32 {
        self.quantity
    }
}

/// An order joined with its customer and computed total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub order: Order,
    pub customer_name: String,
    pub customer_email: Email,
    pub total: Decimal,
    pub line_count: i64,
}

impl OrderSummary {
    /// Case-insensitive match of `query` against the order id, customer name,
    /// customer email and status. A blank query matches everything.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        let id = self.order.id.to_string();
        let id_query = query.trim_start_matches('#');
        id == id_query
            || self.customer_name.to_lowercase().contains(&query)
            || self.customer_email.as_str().contains(&query)
            || self.order.status.to_string().contains(&query)
            || self.order.status.label().contains(&query)
    }
}

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn summary() -> OrderSummary {
        OrderSummary {
            order: Order {
                id: OrderId::new(42),
                customer_id: UserId::new(1),
                created_at: Utc::now(),
                status: OrderStatus::Completed,
                receipt_file: None,
            },
            customer_name: "Lucía Pérez".to_owned(),
            customer_email: Email::parse("lucia@example.com").unwrap(),
            total: Decimal::new(2550, 2),
            line_count: 2,
        }
    }

    #[test]
    fn test_blank_query_matches() {
        assert!(summary().matches(""));
        assert!(summary().matches("   "));
    }

    #[test]
    fn test_matches_name_case_insensitive() {
        assert!(summary().matches("lucía"));
        assert!(summary().matches("PÉREZ"));
    }

    #[test]
    fn test_matches_email_and_status() {
        assert!(summary().matches("EXAMPLE.com"));
        assert!(summary().matches("complet"));
    }

    #[test]
    fn test_matches_exact_id() {
        assert!(summary().matches("42"));
        assert!(summary().matches("#42"));
        assert!(!summary().matches("4"));
    }

    #[test]
    fn test_no_match() {
        assert!(!summary().matches("zapatos"));
    }

    #[test]
    fn test_order_line_subtotal() {
        let line = OrderLine {
            id: OrderLineId::new(1),
            order_id: OrderId::new(42),
            product_id: None,
            product_name: "Borrado".to_owned(),
            unit_price: Decimal::new(1000, 2),
            quantity: 2,
        };
        assert_eq!(line.subtotal(), Decimal::new(2000, 2));
    }
}
