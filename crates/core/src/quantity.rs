//! Fixed-point quantity value object.
//!
//! Quantities in this domain are tonnages with centiton precision. They are
//! carried as [`rust_decimal::Decimal`] so aggregation never loses precision
//! to binary floating point. A [`Quantity`] is **never negative**; signed
//! audit arithmetic is done on raw `Decimal` by the callers that need it.

use core::ops::Add;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// A non-negative decimal quantity (tons, with at least 2 fractional digits).
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    /// Create a quantity, rejecting negative values.
    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::validation(format!(
                "quantity must not be negative (got {value})"
            )));
        }
        Ok(Self(value))
    }

    /// Create a strictly positive quantity (movement amounts must be > 0).
    pub fn positive(value: Decimal) -> DomainResult<Self> {
        let qty = Self::new(value)?;
        if qty.is_zero() {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }
        Ok(qty)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtract, flooring the result at zero.
    ///
    /// This is the materialized-stock floor policy: a decrement larger than
    /// the running total clamps to zero instead of going negative.
    pub fn saturating_sub(self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - other.0)
        }
    }
}

impl ValueObject for Quantity {}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Self) -> Self::Output {
        // Sum of non-negatives stays non-negative.
        Quantity(self.0 + rhs.0)
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Centiton precision for display (storage keeps the full scale).
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Quantity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s)
            .map_err(|e| DomainError::validation(format!("quantity: {e}")))?;
        Self::new(value)
    }
}
