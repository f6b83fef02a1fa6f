//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored in the reference currency's standard unit (e.g. dollars)
//! and converted to integer minor units (e.g. cents) only when talking to the
//! payment provider.

use core::fmt;
use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount does not fit the provider's integer minor-unit contract.
    #[error("price is out of range")]
    OutOfRange,
}

/// A non-negative amount in the reference currency.
///
/// Serialized as a JSON number (`9.99`) for compatibility with existing
/// catalog documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount.normalize()))
    }

    /// Parse a price from user input such as `"9.99"`.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Invalid` if the input is not a decimal number and
    /// `PriceError::Negative` if it is below zero.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount = Decimal::from_str(s.trim()).map_err(|e| PriceError::Invalid(e.to_string()))?;
        Self::new(amount)
    }

    /// Convert from a floating point column value.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Invalid` for NaN or infinite values and
    /// `PriceError::Negative` for amounts below zero.
    pub fn from_f64(value: f64) -> Result<Self, PriceError> {
        let amount =
            Decimal::from_f64(value).ok_or_else(|| PriceError::Invalid(value.to_string()))?;
        Self::new(amount)
    }

    /// Convert to a floating point value for storage in a `REAL` column.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// The amount in standard units.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The amount in integer minor units: `round(price × 100)`.
    ///
    /// Midpoints round away from zero.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::OutOfRange` if the result does not fit in an `i64`.
    pub fn minor_units(&self) -> Result<i64, PriceError> {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(PriceError::OutOfRange)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(PriceError::OutOfRange)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units() {
        assert_eq!(Price::parse("0").unwrap().minor_units().unwrap(), 0);
        assert_eq!(Price::parse("0.01").unwrap().minor_units().unwrap(), 1);
        assert_eq!(Price::parse("9.99").unwrap().minor_units().unwrap(), 999);
        assert_eq!(Price::parse("100.00").unwrap().minor_units().unwrap(), 10_000);
    }

    #[test]
    fn test_minor_units_rounds_half_away_from_zero() {
        assert_eq!(Price::parse("0.005").unwrap().minor_units().unwrap(), 1);
        assert_eq!(Price::parse("1.234").unwrap().minor_units().unwrap(), 123);
    }

    #[test]
    fn test_minor_units_from_float_column() {
        // 9.99 is not exactly representable as f64
        let price = Price::from_f64(9.99).unwrap();
        assert_eq!(price.minor_units().unwrap(), 999);
    }

    #[test]
    fn test_minor_units_out_of_range() {
        let price = Price::new(Decimal::MAX).unwrap();
        assert_eq!(price.minor_units(), Err(PriceError::OutOfRange));
    }

    #[test]
    fn test_parse_rejects_negative_and_garbage() {
        assert_eq!(Price::parse("-1"), Err(PriceError::Negative));
        assert!(matches!(Price::parse("abc"), Err(PriceError::Invalid(_))));
        assert!(matches!(Price::parse(""), Err(PriceError::Invalid(_))));
        assert!(Price::from_f64(f64::NAN).is_err());
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::parse("9.9").unwrap().to_string(), "9.90");
        assert_eq!(Price::parse("100").unwrap().to_string(), "100.00");
    }

    #[test]
    fn test_json_number_format() {
        let price: Price = serde_json::from_str("9.99").unwrap();
        assert_eq!(price, Price::parse("9.99").unwrap());
        assert_eq!(serde_json::to_string(&price).unwrap(), "9.99");

        let whole: Price = serde_json::from_str("100").unwrap();
        assert_eq!(whole.minor_units().unwrap(), 10_000);

        assert!(serde_json::from_str::<Price>("-5").is_err());
    }
}
