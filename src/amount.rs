//! Monetary amount type for ledger entries.
//!
//! Wraps `rust_decimal` so that sums over a batch never pick up floating-point
//! drift, and knows how to coerce the loosely typed cells a ledger export
//! produces ("1,234,000", " -200000 ", 50000, 1.5e6).

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// A signed ledger amount. Positive is money in, negative is money out.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use ledger_classifier::Amount;
///
/// let amount = Amount::from_str("1,234,000").unwrap();
/// assert_eq!(amount.to_string(), "1234000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// Zero value.
    pub const ZERO: Self = Amount(Decimal::ZERO);

    /// Creates an amount from a `Decimal`.
    pub fn new(value: Decimal) -> Self {
        Amount(value.normalize())
    }

    /// Creates an amount from a whole number of currency units.
    pub fn from_whole(units: i64) -> Self {
        Amount(Decimal::from(units))
    }

    /// Coerces a raw cell value.
    ///
    /// Numbers are taken as is; strings have thousands separators and
    /// whitespace stripped before parsing. Anything else, or a string that
    /// still fails to parse, yields `None` rather than zero.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Amount::from_whole(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Amount(Decimal::from(u)))
                } else {
                    n.as_f64().and_then(Decimal::from_f64).map(Amount::new)
                }
            }
            Value::String(s) => Amount::from_str(s).ok(),
            _ => None,
        }
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if this value is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Absolute value, used for magnitude comparisons.
    pub fn abs(&self) -> Self {
        Amount(self.0.abs())
    }

    /// The underlying decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let cleaned: String = s
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect();
        let decimal = Decimal::from_str(&cleaned).or_else(|_| Decimal::from_scientific(&cleaned))?;
        Ok(Amount::new(decimal))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_str_strips_separators_and_whitespace() {
        assert_eq!(Amount::from_str("1,234,000").unwrap().to_string(), "1234000");
        assert_eq!(Amount::from_str("  -200 000 ").unwrap().to_string(), "-200000");
        assert_eq!(Amount::from_str("12.50").unwrap().to_string(), "12.5");
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!(Amount::from_str("abc").is_err());
        assert!(Amount::from_str("").is_err());
        assert!(Amount::from_str(" , ").is_err());
    }

    #[test]
    fn test_from_value_numbers_and_strings() {
        assert_eq!(Amount::from_value(&json!(50000)), Some(Amount::from_whole(50000)));
        assert_eq!(Amount::from_value(&json!(-3000000)), Some(Amount::from_whole(-3000000)));
        assert_eq!(
            Amount::from_value(&json!("1,000")),
            Some(Amount::from_whole(1000))
        );
        assert_eq!(
            Amount::from_value(&json!(1.5)),
            Some(Amount::from_str("1.5").unwrap())
        );
    }

    #[test]
    fn test_from_value_degrades_to_none() {
        assert_eq!(Amount::from_value(&json!(null)), None);
        assert_eq!(Amount::from_value(&json!({"v": 1})), None);
        assert_eq!(Amount::from_value(&json!([1, 2])), None);
        assert_eq!(Amount::from_value(&json!(true)), None);
        assert_eq!(Amount::from_value(&json!("12만원")), None);
    }

    #[test]
    fn test_sign_helpers() {
        assert!(Amount::from_whole(1).is_positive());
        assert!(!Amount::from_whole(-1).is_positive());
        assert!(Amount::from_str("0.00").unwrap().is_zero());
        assert_eq!(Amount::from_whole(-5).abs(), Amount::from_whole(5));
    }

    #[test]
    fn test_sum() {
        let total: Amount = [100, -30, 5].iter().map(|u| Amount::from_whole(*u)).sum();
        assert_eq!(total, Amount::from_whole(75));
    }
}
