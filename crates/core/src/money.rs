//! Fixed-point monetary amounts.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of fractional digits every amount is rounded to.
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Amount cannot be negative: {0}")]
    Negative(Decimal),

    #[error("Invalid amount: {0}")]
    Invalid(String),

    #[error("Amount out of range")]
    Overflow,
}

/// A non-negative currency amount with two fractional digits.
///
/// Every constructor rounds half away from zero to [`MONEY_SCALE`] places and
/// rescales, so `Money` always renders as `12.50`, never `12.5` or `12.500`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, MONEY_SCALE));

    /// Create an amount from a decimal, rounding to cents.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        Ok(Self::round(amount))
    }

    /// Create an amount from a whole number of cents.
    pub fn from_cents(cents: u64) -> Self {
        Self(Decimal::new(cents as i64, MONEY_SCALE))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Multiply by a unit count.
    pub fn times(&self, units: u32) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(Decimal::from(units))
            .map(Self::round)
            .ok_or(MoneyError::Overflow)
    }

    /// Multiply by a non-negative rate (e.g. a commission percentage).
    pub fn scaled(&self, rate: Decimal) -> Result<Self, MoneyError> {
        let product = self.0.checked_mul(rate).ok_or(MoneyError::Overflow)?;
        Self::new(product)
    }

    pub fn checked_add(&self, rhs: Money) -> Result<Self, MoneyError> {
        self.0
            .checked_add(rhs.0)
            .map(Self::round)
            .ok_or(MoneyError::Overflow)
    }

    fn round(value: Decimal) -> Self {
        let mut rounded =
            value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(MONEY_SCALE);
        // -0.00 collapses to 0.00
        rounded.set_sign_positive(true);
        Self(rounded)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim()).map_err(|_| MoneyError::Invalid(s.to_string()))?;
        Money::new(decimal)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_renders_with_cents() {
        assert_eq!(Money::ZERO.to_string(), "0.00");
        assert!(Money::ZERO.is_zero());
    }

    #[test]
    fn test_new_rounds_half_away_from_zero() {
        let m = Money::new(Decimal::new(12345, 3)).unwrap();
        assert_eq!(m.to_string(), "12.35");
        let m = Money::new(Decimal::new(5, 0)).unwrap();
        assert_eq!(m.to_string(), "5.00");
    }

    #[test]
    fn test_negative_rejected() {
        let result = Money::new(Decimal::new(-1, 2));
        assert!(matches!(result, Err(MoneyError::Negative(_))));
    }

    #[test]
    fn test_from_cents_and_times() {
        let unit = Money::from_cents(4550);
        assert_eq!(unit.to_string(), "45.50");
        assert_eq!(unit.times(3).unwrap().to_string(), "136.50");
        assert_eq!(unit.times(0).unwrap(), Money::ZERO);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let huge: Money = "10000000000000000000000000".parse().unwrap();
        assert_eq!(huge.times(u32::MAX), Err(MoneyError::Overflow));
        assert_eq!(huge.scaled(Decimal::new(10_000, 0)), Err(MoneyError::Overflow));
        assert_eq!(
            Money::from_cents(150).checked_add(Money::from_cents(25)),
            Ok(Money::from_cents(175))
        );
    }

    #[test]
    fn test_scaled_by_rate() {
        let base = Money::from_cents(1005);
        let commission = base.scaled(Decimal::new(10, 2)).unwrap();
        // 10.05 * 0.10 = 1.005 -> 1.01
        assert_eq!(commission.to_string(), "1.01");
    }

    #[test]
    fn test_parse() {
        assert_eq!("12.5".parse::<Money>().unwrap().to_string(), "12.50");
        assert!("abc".parse::<Money>().is_err());
        assert!("-3".parse::<Money>().is_err());
    }

    #[test]
    fn test_serde_round_trips_as_string() {
        let m = Money::from_cents(1999);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"19.99\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
        let negative: Result<Money, _> = serde_json::from_str("\"-1.00\"");
        assert!(negative.is_err());
    }
}
