//! Monetary amounts in integer minor units.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! An `Amount` counts the smallest currency unit (rupiah, cents) as an `i64`,
//! so sums and comparisons are exact and never need a tolerance.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by amount arithmetic and conversions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// The result does not fit into 64-bit minor units.
    #[error("Amount overflow")]
    Overflow,

    /// The decimal value has more fractional digits than the minor unit allows.
    #[error("Amount {value} has more than {scale} fractional digits")]
    FractionalMinorUnits {
        /// The offending value.
        value: Decimal,
        /// Number of fractional digits the minor unit supports.
        scale: u32,
    },
}

/// A signed monetary amount in minor units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from a count of minor units.
    #[must_use]
    pub const fn from_minor(units: i64) -> Self {
        Self(units)
    }

    /// Returns the count of minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the amount is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition.
    pub fn checked_add(self, rhs: Self) -> Result<Self, AmountError> {
        self.0.checked_add(rhs.0).map(Self).ok_or(AmountError::Overflow)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, rhs: Self) -> Result<Self, AmountError> {
        self.0.checked_sub(rhs.0).map(Self).ok_or(AmountError::Overflow)
    }

    /// Checked multiplication by a whole quantity.
    pub fn checked_mul(self, quantity: i64) -> Result<Self, AmountError> {
        self.0
            .checked_mul(quantity)
            .map(Self)
            .ok_or(AmountError::Overflow)
    }

    /// Sums amounts, failing on overflow instead of wrapping.
    pub fn checked_sum<I>(amounts: I) -> Result<Self, AmountError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }

    /// Converts a decimal major-unit value into minor units.
    ///
    /// The conversion is exact: `12.345` with a scale of 2 is rejected
    /// rather than rounded.
    pub fn try_from_decimal(value: Decimal, scale: u32) -> Result<Self, AmountError> {
        let factor = 10_i64.checked_pow(scale).ok_or(AmountError::Overflow)?;
        let scaled = value
            .checked_mul(Decimal::from(factor))
            .ok_or(AmountError::Overflow)?;

        if !scaled.fract().is_zero() {
            return Err(AmountError::FractionalMinorUnits { value, scale });
        }

        scaled.to_i64().map(Self).ok_or(AmountError::Overflow)
    }

    /// Converts the amount back into a decimal major-unit value.
    #[must_use]
    pub fn to_decimal(self, scale: u32) -> Decimal {
        Decimal::new(self.0, scale)
    }
}

impl From<i64> for Amount {
    fn from(units: i64) -> Self {
        Self(units)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
