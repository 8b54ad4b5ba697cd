//! Simulated card payment.
//!
//! No money moves: the card form is only checked for plausibility before
//! checkout runs. Card data is never stored or logged, and [`CardDetails`]
//! redacts itself in `Debug` output.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

/// Why a card was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("missing card holder")]
    MissingHolder,
    #[error("invalid card number")]
    InvalidNumber,
    #[error("invalid expiry date")]
    InvalidExpiry,
    #[error("card expired")]
    Expired,
    #[error("invalid security code")]
    InvalidCvv,
}

impl PaymentError {
    /// Message safe to show to the customer.
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::MissingHolder => "Indica el titular de la tarjeta.",
            Self::InvalidNumber => "El número de tarjeta no es válido.",
            Self::InvalidExpiry => "La fecha de caducidad debe tener el formato MM/AA.",
            Self::Expired => "La tarjeta está caducada.",
            Self::InvalidCvv => "El código de seguridad debe tener 3 o 4 dígitos.",
        }
    }
}

/// Card form as submitted.
#[derive(Clone, serde::Deserialize)]
pub struct CardDetails {
    pub card_holder: String,
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("card_holder", &"[REDACTED]")
            .field("card_number", &"[REDACTED]")
            .field("expiry", &"[REDACTED]")
            .field("cvv", &"[REDACTED]")
            .finish()
    }
}

impl CardDetails {
    /// Check the card as of `today`.
    ///
    /// # Errors
    ///
    /// Returns the first [`PaymentError`] found, checking holder, number,
    /// expiry and CVV in that order.
    pub fn validate(&self, today: NaiveDate) -> Result<(), PaymentError> {
        if self.card_holder.trim().is_empty() {
            return Err(PaymentError::MissingHolder);
        }

        let digits: String = self.card_number.chars().filter(|c| *c != ' ' && *c != '-').collect();
        if !(13..=19).contains(&digits.len())
            || !digits.chars().all(|c| c.is_ascii_digit())
            || !luhn_valid(&digits)
        {
            return Err(PaymentError::InvalidNumber);
        }

        let (month, year) = parse_expiry(&self.expiry).ok_or(PaymentError::InvalidExpiry)?;
        if (year, month) < (today.year(), today.month()) {
            return Err(PaymentError::Expired);
        }

        let cvv = self.cvv.trim();
        if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
            return Err(PaymentError::InvalidCvv);
        }

        Ok(())
    }
}

/// Luhn checksum over a string of ASCII digits.
#[must_use]
pub fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(mut d) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}

/// Parse `MM/YY` (or `MM/YYYY`) into `(month, full year)`.
fn parse_expiry(expiry: &str) -> Option<(u32, i32)> {
    let (month, year) = expiry.trim().split_once('/')?;
    let month: u32 = month.trim().parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }

    let year = year.trim();
    let year: i32 = match year.len() {
        2 => 2000 + year.parse::<i32>().ok()?,
        4 => year.parse().ok()?,
        _ => return None,
    };

    Some((month, year))
}
