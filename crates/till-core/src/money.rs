//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Summing line extensions as floats:                                     │
//! │    2.99 × 3 + 1.20 = 10.170000000000002  ❌ WRONG!                      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Pence                                            │
//! │    299 × 3 + 120 = 1017 pence → serialized as 10.17                    │
//! │    The total is exact, so total == Σ unitPrice × quantity always holds │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Downstream APIs expect decimal pounds (`"totalAmount": 10.17`), so `Money`
//! serializes as a JSON number with at most two decimal places and
//! deserializes by rounding to the nearest penny.
//!
//! ## Usage
//! ```rust
//! use till_core::money::Money;
//!
//! let price = Money::from_pence(299); // £2.99
//! let line = price.multiply_quantity(3);
//! assert_eq!(line.pence(), 897);
//! assert_eq!(line.to_string(), "£8.97");
//! ```

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (pence for GBP).
///
/// ## Design Decisions
/// - **i64 (signed)**: arithmetic never panics on subtraction
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Custom serde**: decimal pounds on the wire, pence in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from pence.
    #[inline]
    pub const fn from_pence(pence: i64) -> Self {
        Money(pence)
    }

    /// Parses a decimal pound amount, rounding to the nearest penny.
    ///
    /// Only used at the deserialization boundary; internal arithmetic never
    /// touches floating point.
    pub fn from_decimal(amount: f64) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        let pence = (amount * 100.0).round();
        if pence.abs() > i64::MAX as f64 {
            return None;
        }
        Some(Money(pence as i64))
    }

    /// Returns the value in pence.
    #[inline]
    pub const fn pence(&self) -> i64 {
        self.0
    }

    /// Returns the whole pounds portion.
    #[inline]
    pub const fn pounds(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the pence portion (always 0-99).
    #[inline]
    pub const fn pence_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the amount as decimal pounds, for the wire only.
    #[inline]
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Multiplies a unit price by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let unit_price = Money::from_pence(179); // £1.79
    /// assert_eq!(unit_price.multiply_quantity(2).pence(), 358);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders as `£10.99`, used in log lines.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}£{}.{:02}", sign, self.pounds().abs(), self.pence_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MoneyVisitor;

        impl Visitor<'_> for MoneyVisitor {
            type Value = Money;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal amount in pounds")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
                Money::from_decimal(v).ok_or_else(|| E::custom("amount out of range"))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
                v.checked_mul(100)
                    .map(Money)
                    .ok_or_else(|| E::custom("amount out of range"))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
                i64::try_from(v)
                    .ok()
                    .and_then(|v| v.checked_mul(100))
                    .map(Money)
                    .ok_or_else(|| E::custom("amount out of range"))
            }
        }

        deserializer.deserialize_any(MoneyVisitor)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pence() {
        let money = Money::from_pence(1099);
        assert_eq!(money.pence(), 1099);
        assert_eq!(money.pounds(), 10);
        assert_eq!(money.pence_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_pence(1099).to_string(), "£10.99");
        assert_eq!(Money::from_pence(500).to_string(), "£5.00");
        assert_eq!(Money::from_pence(-550).to_string(), "-£5.50");
        assert_eq!(Money::zero().to_string(), "£0.00");
    }

    #[test]
    fn test_sum_is_exact() {
        // 2.99 × 3 + 1.20 drifts as f64, stays exact in pence
        let total: Money = [Money::from_pence(299).multiply_quantity(3), Money::from_pence(120)]
            .into_iter()
            .sum();
        assert_eq!(total.pence(), 1017);
        assert_eq!(serde_json::to_string(&total).unwrap(), "10.17");
    }

    #[test]
    fn test_serializes_as_decimal_pounds() {
        assert_eq!(serde_json::to_string(&Money::from_pence(599)).unwrap(), "5.99");
        assert_eq!(serde_json::to_string(&Money::from_pence(99)).unwrap(), "0.99");
        assert_eq!(serde_json::to_string(&Money::from_pence(250)).unwrap(), "2.5");
    }

    #[test]
    fn test_deserializes_and_rounds() {
        let m: Money = serde_json::from_str("10.17").unwrap();
        assert_eq!(m.pence(), 1017);

        let m: Money = serde_json::from_str("12").unwrap();
        assert_eq!(m.pence(), 1200);

        let m: Money = serde_json::from_str("0.1").unwrap();
        assert_eq!(m.pence(), 10);

        assert!(serde_json::from_str::<Money>("\"5.00\"").is_err());
    }

    #[test]
    fn test_from_decimal_rejects_non_finite() {
        assert!(Money::from_decimal(f64::NAN).is_none());
        assert!(Money::from_decimal(f64::INFINITY).is_none());
        assert_eq!(Money::from_decimal(8.99), Some(Money::from_pence(899)));
    }

    #[test]
    fn test_positive_checks() {
        assert!(!Money::zero().is_positive());
        assert!(!Money::from_pence(-550).is_positive());
        assert!(Money::from_pence(1).is_positive());
    }
}
