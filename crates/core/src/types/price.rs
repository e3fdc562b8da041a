//! Prices and the shared tax computation.
//!
//! Every tax-inclusive figure in Atelier (catalog, cart line, order email)
//! goes through [`Price::with_tax`] so the three never disagree.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value-added tax applied to every sale price (19%).
pub const TAX_RATE: Decimal = Decimal::from_parts(19, 0, 0, false, 2);

/// Currency shown next to formatted amounts.
pub const CURRENCY: &str = "TND";

/// An amount left the range a [`Decimal`] can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("amount is too large")]
pub struct AmountOverflow;

/// A monetary amount in the shop currency.
///
/// The amount is kept at full precision; rounding happens only when a figure
/// is presented ([`Price::rounded`], `Display`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// The amount including [`TAX_RATE`], unrounded.
    ///
    /// # Errors
    ///
    /// Returns [`AmountOverflow`] if the result does not fit a `Decimal`.
    pub fn with_tax(self) -> Result<Self, AmountOverflow> {
        self.0
            .checked_mul(Decimal::ONE + TAX_RATE)
            .map(Self)
            .ok_or(AmountOverflow)
    }

    /// `self + rhs`.
    ///
    /// # Errors
    ///
    /// Returns [`AmountOverflow`] if the sum does not fit a `Decimal`.
    pub fn checked_add(self, rhs: Self) -> Result<Self, AmountOverflow> {
        self.0.checked_add(rhs.0).map(Self).ok_or(AmountOverflow)
    }

    /// The amount for `quantity` units.
    ///
    /// # Errors
    ///
    /// Returns [`AmountOverflow`] if the product does not fit a `Decimal`.
    pub fn times(self, quantity: u32) -> Result<Self, AmountOverflow> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Self)
            .ok_or(AmountOverflow)
    }

    /// Rounded to cents, halves away from zero.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {CURRENCY}", self.rounded().0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        Price::new(s.parse().unwrap())
    }

    #[test]
    fn test_with_tax() {
        assert_eq!(price("100").with_tax().unwrap().rounded(), price("119.00"));
        assert_eq!(price("12.50").with_tax().unwrap().rounded(), price("14.88"));
    }

    #[test]
    fn test_rounding_midpoint_away_from_zero() {
        assert_eq!(price("0.125").rounded(), price("0.13"));
        assert_eq!(price("0.135").rounded(), price("0.14"));
    }

    #[test]
    fn test_display() {
        assert_eq!(price("12.5").to_string(), "12.50 TND");
        assert_eq!(price("3").with_tax().unwrap().to_string(), "3.57 TND");
    }

    #[test]
    fn test_add_and_quantity() {
        let total = price("1.10").times(3).unwrap().checked_add(price("2.00")).unwrap();
        assert_eq!(total, price("5.30"));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let huge = price("70000000000000000000000000000");
        assert_eq!(huge.times(4), Err(AmountOverflow));
        assert_eq!(huge.with_tax(), Err(AmountOverflow));
        assert_eq!(huge.checked_add(huge), Err(AmountOverflow));
        assert_eq!(huge.times(1), Ok(huge));
    }

    #[test]
    fn test_deserialize_from_number_and_string() {
        let from_number: Price = serde_json::from_str("12.5").unwrap();
        let from_string: Price = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(from_number, from_string);
    }
}
