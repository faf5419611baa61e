//! Cart line quantities.

use serde::{Deserialize, Serialize};

/// Reasons a quantity is rejected.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero or negative.
    #[error("quantity must be at least 1 (got {0})")]
    NotPositive(i32),
    /// Adding to an existing line would overflow.
    #[error("quantity is too large")]
    Overflow,
}

/// A strictly positive number of units on a cart line.
///
/// Stored as `i32` to match the `INTEGER` column. Every cart operation that
/// takes a quantity (add, update, remove) goes through [`Quantity::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// One unit.
    pub const ONE: Self = Self(1);

    /// Validate a raw quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::NotPositive`] for values below 1.
    pub const fn new(value: i32) -> Result<Self, QuantityError> {
        if value < 1 {
            return Err(QuantityError::NotPositive(value));
        }
        Ok(Self(value))
    }

    /// The raw count.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// `self + other`, used when merging an add into an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Overflow`] if the sum does not fit.
    pub const fn checked_add(self, other: Self) -> Result<Self, QuantityError> {
        match self.0.checked_add(other.0) {
            Some(sum) => Ok(Self(sum)),
            None => Err(QuantityError::Overflow),
        }
    }

    /// What is left after taking `other` away, or `None` when nothing is.
    #[must_use]
    pub const fn saturating_remove(self, other: Self) -> Option<Self> {
        if self.0 <= other.0 {
            None
        } else {
            Some(Self(self.0 - other.0))
        }
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_and_negative() {
        assert_eq!(Quantity::new(0), Err(QuantityError::NotPositive(0)));
        assert_eq!(Quantity::new(-4), Err(QuantityError::NotPositive(-4)));
        assert_eq!(Quantity::new(1), Ok(Quantity::ONE));
    }

    #[test]
    fn test_remove_partial_and_full() {
        let five = Quantity::new(5).unwrap();
        assert_eq!(
            five.saturating_remove(Quantity::new(2).unwrap()),
            Some(Quantity::new(3).unwrap())
        );
        assert_eq!(five.saturating_remove(five), None);
        assert_eq!(five.saturating_remove(Quantity::new(9).unwrap()), None);
    }

    #[test]
    fn test_checked_add_overflow() {
        let max = Quantity::new(i32::MAX).unwrap();
        assert_eq!(max.checked_add(Quantity::ONE), Err(QuantityError::Overflow));
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("3").unwrap().get(), 3);
    }
}
