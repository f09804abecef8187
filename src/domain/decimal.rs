//! Arbitrary-precision decimal numeric type backed by bigdecimal.
//!
//! Provides canonical parsing from strings, formatting without exponent notation,
//! checked arithmetic for the pricing engine and the truncation rules applied at
//! persistence boundaries.

use bigdecimal::num_bigint::BigInt;
use bigdecimal::num_bigint::Sign;
use bigdecimal::{BigDecimal, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fractional digits kept when a percentage crosses the service boundary.
pub const PERCENT_DP: u32 = 2;

/// Integer digits a value may carry before checked arithmetic reports overflow.
///
/// Wide enough for 18-decimal token amounts multiplied by 18-decimal prices.
pub const MAX_INTEGER_DIGITS: i64 = 96;

/// Fractional digits accepted when parsing.
pub const MAX_FRACTION_DIGITS: i64 = 96;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecimalParseError {
    #[error("invalid decimal number")]
    Invalid,
    #[error("decimal number out of range")]
    OutOfRange,
}

/// Lossless decimal numeric type for curve pricing and ledger accounting.
///
/// Serializes to a JSON string so no precision is lost on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal(BigDecimal);

impl Decimal {
    /// `mantissa * 10^-scale`, exactly.
    pub fn from_scaled(mantissa: i64, scale: i64) -> Self {
        Decimal(BigDecimal::new(BigInt::from(mantissa), scale))
    }

    /// `10^exponent`, exactly.
    pub fn ten_pow(exponent: u32) -> Self {
        Self::from_scaled(1, -i64::from(exponent))
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a decimal number or its magnitude
    /// falls outside the supported range.
    pub fn from_str_canonical(s: &str) -> Result<Self, DecimalParseError> {
        let value = BigDecimal::from_str(s.trim()).map_err(|_| DecimalParseError::Invalid)?;
        let (_, scale) = value.as_bigint_and_exponent();
        if scale > MAX_FRACTION_DIGITS || !within_bound(&value) {
            return Err(DecimalParseError::OutOfRange);
        }
        Ok(Decimal(value))
    }

    /// Format the Decimal as a canonical string (no exponent notation, no trailing zeros).
    pub fn to_canonical_string(&self) -> String {
        plain_string(&self.0.normalized())
    }

    pub fn zero() -> Self {
        Decimal(BigDecimal::from(0i64))
    }

    pub fn one() -> Self {
        Decimal(BigDecimal::from(1i64))
    }

    pub fn two() -> Self {
        Decimal(BigDecimal::from(2i64))
    }

    pub fn hundred() -> Self {
        Decimal(BigDecimal::from(100i64))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        self.0 > BigDecimal::from(0i64)
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        self.0 < BigDecimal::from(0i64)
    }

    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    pub fn checked_add(&self, rhs: impl Borrow<Decimal>) -> Option<Decimal> {
        bounded(&self.0 + &rhs.borrow().0)
    }

    pub fn checked_sub(&self, rhs: impl Borrow<Decimal>) -> Option<Decimal> {
        bounded(&self.0 - &rhs.borrow().0)
    }

    pub fn checked_mul(&self, rhs: impl Borrow<Decimal>) -> Option<Decimal> {
        bounded(&self.0 * &rhs.borrow().0)
    }

    /// Checked division; `None` on a zero divisor or overflow.
    ///
    /// Non-terminating quotients keep bigdecimal's default precision.
    pub fn checked_div(&self, rhs: impl Borrow<Decimal>) -> Option<Decimal> {
        let rhs = rhs.borrow();
        if rhs.is_zero() {
            return None;
        }
        bounded(&self.0 / &rhs.0)
    }

    /// Truncate toward zero to `dp` fractional digits.
    ///
    /// The result carries exactly `dp` fractional digits.
    pub fn trunc_dp(&self, dp: u32) -> Self {
        Decimal(self.0.with_scale(i64::from(dp)))
    }

    /// Truncate to whole smallest units, the representation used when persisting amounts.
    pub fn trunc_units(&self) -> Self {
        self.trunc_dp(0)
    }

    /// Truncate to the fixed percentage precision.
    pub fn trunc_percent(&self) -> Self {
        self.trunc_dp(PERCENT_DP)
    }

    /// Format truncated to exactly `dp` fractional digits, zero padded.
    pub fn to_fixed_string(&self, dp: u32) -> String {
        plain_string(&self.trunc_dp(dp).0)
    }

    /// Whole smallest units as `u128`, if non-negative and representable.
    pub fn to_u128_units(&self) -> Option<u128> {
        if self.is_negative() {
            return None;
        }
        let (units, _) = self.trunc_units().0.as_bigint_and_exponent();
        u128::try_from(units).ok()
    }
}

fn within_bound(value: &BigDecimal) -> bool {
    let (digits, scale) = value.as_bigint_and_exponent();
    let digit_count = digits.magnitude().to_string().len() as i64;
    digits.magnitude().bits() == 0 || digit_count - scale <= MAX_INTEGER_DIGITS
}

fn bounded(value: BigDecimal) -> Option<Decimal> {
    within_bound(&value).then_some(Decimal(value))
}

/// Positional notation of `value` at its own scale.
fn plain_string(value: &BigDecimal) -> String {
    let (digits, scale) = value.as_bigint_and_exponent();
    let negative = digits.sign() == Sign::Minus;
    let mut magnitude = digits.magnitude().to_string();

    let body = if scale <= 0 {
        if magnitude != "0" {
            magnitude.push_str(&"0".repeat(scale.unsigned_abs() as usize));
        }
        magnitude
    } else {
        let scale = scale as usize;
        if magnitude.len() <= scale {
            magnitude.insert_str(0, &"0".repeat(scale - magnitude.len() + 1));
        }
        let point = magnitude.len() - scale;
        magnitude.insert(point, '.');
        magnitude
    };

    if negative {
        format!("-{}", body)
    } else {
        body
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal(BigDecimal::from(value))
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Decimal(BigDecimal::from(value))
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

struct DecimalVisitor;

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a decimal number encoded as a string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
        Decimal::from_str_canonical(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }
}

// Arithmetic operators never overflow; the pricing engine still goes through the
// checked variants so results stay inside the supported range.
macro_rules! forward_binop {
    ($trait:ident, $method:ident) => {
        impl std::ops::$trait for Decimal {
            type Output = Decimal;

            fn $method(self, rhs: Decimal) -> Decimal {
                Decimal(std::ops::$trait::$method(self.0, rhs.0))
            }
        }

        impl<'a> std::ops::$trait<&'a Decimal> for &'a Decimal {
            type Output = Decimal;

            fn $method(self, rhs: &'a Decimal) -> Decimal {
                Decimal(std::ops::$trait::$method(&self.0, &rhs.0))
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, d| acc + d)
    }
}

impl<'a> std::iter::Sum<&'a Decimal> for Decimal {
    fn sum<I: Iterator<Item = &'a Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, d| &acc + d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_decimal_parse_roundtrip() {
        let test_cases = vec![
            "123.456",
            "0.0001",
            "1000000",
            "-123.456",
            "0",
            "999999999.999999999",
            "1000000000000000000000000000000000000",
        ];

        for s in test_cases {
            let decimal = d(s);
            let formatted = decimal.to_canonical_string();
            assert_eq!(formatted, s);
            assert_eq!(decimal, d(&formatted), "roundtrip failed for {}", s);
        }
    }

    #[test]
    fn test_decimal_canonical_strips_trailing_zeros() {
        assert_eq!(d("1500.000").to_canonical_string(), "1500");
        assert_eq!(d("0.50").to_canonical_string(), "0.5");
        assert_eq!(d("1e6").to_canonical_string(), "1000000");
        assert_eq!(d("0.000000001").to_canonical_string(), "0.000000001");
        assert_eq!(d("-0.000").to_canonical_string(), "0");
    }

    #[test]
    fn test_decimal_json_is_string() {
        let json = serde_json::to_value(d("123.456")).unwrap();
        assert!(json.is_string());
        assert_eq!(json, serde_json::json!("123.456"));

        let back: Decimal = serde_json::from_value(json).unwrap();
        assert_eq!(back, d("123.456"));

        let whole: Decimal = serde_json::from_value(serde_json::json!(42)).unwrap();
        assert_eq!(whole, d("42"));
        assert!(serde_json::from_value::<Decimal>(serde_json::json!("abc")).is_err());
    }

    #[test]
    fn test_trunc_units_never_rounds_up() {
        assert_eq!(d("1499.999").trunc_units(), d("1499"));
        assert_eq!(d("-2.7").trunc_units(), d("-2"));
        assert_eq!(d("-0.4").trunc_units().to_canonical_string(), "0");
    }

    #[test]
    fn test_to_fixed_string_pads_and_truncates() {
        assert_eq!(d("1.5").to_fixed_string(2), "1.50");
        assert_eq!(d("3.14159").to_fixed_string(2), "3.14");
        assert_eq!(d("-0.001").to_fixed_string(2), "0.00");
        assert_eq!(d("-1.239").to_fixed_string(2), "-1.23");
        assert_eq!(d("12").to_fixed_string(0), "12");
        assert_eq!(d("0.05").to_fixed_string(4), "0.0500");
    }

    #[test]
    fn test_checked_div_by_zero_is_none() {
        assert_eq!(d("10").checked_div(Decimal::zero()), None);
        assert_eq!(d("10").checked_div(d("4")), Some(d("2.5")));
    }

    #[test]
    fn test_eighteen_decimal_products_stay_exact() {
        let amount = d("1000000000000000000000");
        let price = d("1000000000000000000.5");
        assert_eq!(
            amount.checked_mul(&price),
            Some(d("1000000000000000000500000000000000000000"))
        );
    }

    #[test]
    fn test_checked_mul_past_bound_is_none() {
        let big = Decimal::ten_pow(60);
        assert_eq!(big.checked_mul(&big), None);
        assert!(big.checked_mul(Decimal::ten_pow(36)).is_some());
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert_eq!(
            Decimal::from_str_canonical("1e1000"),
            Err(DecimalParseError::OutOfRange)
        );
        assert_eq!(
            Decimal::from_str_canonical("1e-1000"),
            Err(DecimalParseError::OutOfRange)
        );
        assert_eq!(
            Decimal::from_str_canonical("12abc"),
            Err(DecimalParseError::Invalid)
        );
    }

    #[test]
    fn test_to_u128_units() {
        assert_eq!(d("100.9").to_u128_units(), Some(100));
        assert_eq!(d("-1").to_u128_units(), None);
        assert_eq!(Decimal::ten_pow(40).to_u128_units(), None);
    }

    #[test]
    fn test_scaled_constructors() {
        assert_eq!(Decimal::from_scaled(1, 2), d("0.01"));
        assert_eq!(Decimal::ten_pow(18).to_canonical_string(), "1000000000000000000");
        assert_eq!(Decimal::ten_pow(0), Decimal::one());
    }

    #[test]
    fn test_decimal_arithmetic_and_sum() {
        let a = d("10.5");
        let b = d("2.5");
        assert_eq!((&a + &b).to_canonical_string(), "13");
        assert_eq!((&a - &b).to_canonical_string(), "8");
        assert_eq!((&a * &b).to_canonical_string(), "26.25");
        assert_eq!(vec![a, b, d("1")].into_iter().sum::<Decimal>(), d("14"));
    }

    #[test]
    fn test_decimal_sign_helpers() {
        assert!(d("1").is_positive());
        assert!(d("-1").is_negative());
        assert!(!Decimal::zero().is_positive());
        assert!(!Decimal::zero().is_negative());
    }
}
