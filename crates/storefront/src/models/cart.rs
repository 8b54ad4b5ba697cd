//! Cart domain types and money arithmetic.
//!
//! All totals use [`Decimal`] so that sums of prices are exact.

use rust_decimal::Decimal;
use serde::Serialize;

use tienda_core::ProductId;

/// Anything priced per unit and bought in some quantity.
pub trait LineItem {
    /// Price of one unit.
    fn unit_price(&self) -> Decimal;

    /// Number of units.
    fn quantity(&self) -> i32;

    /// `unit_price * quantity`.
    fn subtotal(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity())
    }
}

/// Sum of line subtotals. An empty slice totals zero.
#[must_use]
pub fn compute_total<L: LineItem>(lines: &[L]) -> Decimal {
    lines.iter().map(LineItem::subtotal).sum()
}

/// Total number of units across all lines.
#[must_use]
pub fn item_count<L: LineItem>(lines: &[L]) -> i64 {
    lines.iter().map(|line| i64::from(line.quantity())).sum()
}

/// One product in a user's cart, joined with its catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    /// Current catalog stock, for display only.
    #[serde(skip)]
    pub stock: i32,
}

impl LineItem for CartLine {
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    fn quantity(&self) -> i32 {
        self.quantity
    }
}
