//! Non-negative decimal prices.
//!
//! The store sells in a single currency, so a price is just an amount. The
//! currency label used on receipts comes from configuration.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::Quantity;

/// Reasons a price is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
    /// Prices must fit the `NUMERIC(10, 2)` price column.
    #[error("price cannot exceed 99999999.99 (got {0})")]
    TooLarge(Decimal),
}

const SCALE: u32 = 2;

/// Largest unit price: 8 integer digits and 2 fractional ones.
const MAX_UNIT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, SCALE);

/// A unit price or a computed total.
///
/// Serialized as a decimal string (`"49.99"`) so no precision is lost in
/// JSON. Multiplying by a [`Quantity`] yields the line total.
///
/// ```
/// use bookshop_core::{Price, Quantity};
/// use rust_decimal::Decimal;
///
/// let unit = Price::new(Decimal::new(1000, 2)).unwrap();
/// let line = unit.line_total(Quantity::new(2).unwrap());
/// assert_eq!(line.amount(), Decimal::new(2000, 2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero, the identity for summing totals. Displays as `0.00`.
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, SCALE));

    /// Validate an amount and fix it to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for amounts below zero and
    /// [`PriceError::TooLarge`] above `99999999.99`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        let mut amount =
            amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
        if amount > MAX_UNIT {
            return Err(PriceError::TooLarge(amount));
        }
        amount.rescale(SCALE);
        Ok(Self(amount))
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// `self × quantity`. Totals are not bounded by the unit price limit.
    #[must_use]
    pub fn line_total(self, quantity: Quantity) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity.get())))
    }
}

impl std::ops::Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, p| acc + p)
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

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
