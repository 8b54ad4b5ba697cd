//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(10,2)`, so a [`Price`] is always strictly
//! positive, has at most two decimal places and fits in eight integer digits.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input string is empty.
    #[error("price cannot be empty")]
    Empty,
    /// The input is not a decimal number.
    #[error("price must be a decimal number")]
    NotANumber,
    /// The amount is zero or negative.
    #[error("price must be greater than zero")]
    NotPositive,
    /// The amount has more than two decimal places.
    #[error("price can have at most two decimal places")]
    TooPrecise,
    /// The amount does not fit the storage column.
    #[error("price must be less than {max}")]
    TooLarge {
        /// Exclusive upper bound.
        max: Decimal,
    },
}

/// A strictly positive product price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Exclusive upper bound imposed by `NUMERIC(10,2)`.
    pub const MAX: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

    /// Validate a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if the amount is not positive, has more than
    /// two decimal places or is too large to store.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        if amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }
        if amount >= Self::MAX {
            return Err(PriceError::TooLarge { max: Self::MAX });
        }
        Ok(Self(amount))
    }

    /// Parse a price typed into a form. A comma is accepted as the decimal
    /// separator.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if the input is empty, not a number, or fails
    /// the checks of [`Price::new`].
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PriceError::Empty);
        }
        let amount = Decimal::from_str(&s.replace(',', ".")).map_err(|_| PriceError::NotANumber)?;
        Self::new(amount)
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

/// Format a money amount for display, e.g. `$25.50`.
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_money(self.0))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(Price::parse("10").unwrap().amount(), Decimal::new(10, 0));
        assert_eq!(Price::parse("5.50").unwrap().amount(), Decimal::new(550, 2));
        assert_eq!(Price::parse(" 5,5 ").unwrap().amount(), Decimal::new(55, 1));
        assert_eq!(Price::parse("0.01").unwrap().amount(), Decimal::new(1, 2));
    }

    #[test]
    fn test_parse_rejects() {
        assert_eq!(Price::parse(""), Err(PriceError::Empty));
        assert_eq!(Price::parse("abc"), Err(PriceError::NotANumber));
        assert_eq!(Price::parse("0"), Err(PriceError::NotPositive));
        assert_eq!(Price::parse("-3.00"), Err(PriceError::NotPositive));
        assert_eq!(Price::parse("1.999"), Err(PriceError::TooPrecise));
        assert!(matches!(
            Price::parse("100000000"),
            Err(PriceError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_trailing_zeros_are_not_precision() {
        assert!(Price::parse("2.5000").is_ok());
    }

    #[test]
    fn test_max_is_numeric_10_2_bound() {
        assert_eq!(Price::MAX, Decimal::new(100_000_000, 0));
        assert!(Price::parse("99999999.99").is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::parse("25.5").unwrap().to_string(), "$25.50");
        assert_eq!(format_money(Decimal::ZERO), "$0.00");
    }

    #[test]
    fn test_serde() {
        let price: Price = serde_json::from_str("\"10.00\"").unwrap();
        assert_eq!(price.amount(), Decimal::new(1000, 2));
        assert!(serde_json::from_str::<Price>("\"-1\"").is_err());
    }
}
