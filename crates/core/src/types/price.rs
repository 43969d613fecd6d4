//! Type-safe price representation using decimal arithmetic.
//!
//! Catalog prices are stored in the currency's standard unit (dollars, not
//! cents). Payment providers want integral minor units, which
//! [`Price::to_minor_units`] produces.
//!
//! Every `Price` fits a `NUMERIC(10, 2)` column: at most two decimal places
//! and at most [`Price::MAX`]. Arithmetic is checked and fails with
//! [`PriceError::Overflow`] instead of leaving that range.

use core::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing or converting a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount is above [`Price::MAX`].
    #[error("price is too large")]
    Overflow,
}

/// A non-negative amount of money, rounded to cents.
///
/// ```
/// use cosmic_blueprints_core::Price;
/// use rust_decimal::Decimal;
///
/// let total = Price::total([Price::from_cents(3999), Price::from_cents(4999)]).unwrap();
/// assert_eq!(total.amount(), Decimal::new(8998, 2));
/// assert_eq!(total.to_minor_units().unwrap(), 8998);
///
/// assert!(Price::new(Decimal::MAX).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// A price of zero, used for comped orders.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// The largest storable price, 99,999,999.99.
    pub const MAX: Self = Self(Decimal::from_parts(1_410_065_407, 2, 0, false, 2));

    /// Create a new price, rounding half away from zero to cents.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount` is below zero and
    /// `PriceError::Overflow` if it is above [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount > Self::MAX.0 {
            return Err(PriceError::Overflow);
        }
        Ok(Self(amount.round_dp_with_strategy(
            2,
            RoundingStrategy::MidpointAwayFromZero,
        )))
    }

    /// Create a price from an integral number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The amount in standard units.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether this price is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Convert to integral minor units (cents).
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the result does not fit in an `i64`.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|cents| cents.to_i64())
            .ok_or(PriceError::Overflow)
    }

    /// Add two prices.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the sum is above [`Price::MAX`].
    pub fn checked_add(self, rhs: Self) -> Result<Self, PriceError> {
        self.0
            .checked_add(rhs.0)
            .ok_or(PriceError::Overflow)
            .and_then(Self::new)
    }

    /// Sum of `prices`; zero when there are none.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the sum is above [`Price::MAX`].
    pub fn total<I>(prices: I) -> Result<Self, PriceError>
    where
        I: IntoIterator<Item = Self>,
    {
        prices.into_iter().try_fold(Self::ZERO, Self::checked_add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
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
