use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::DomainError;

/// Fixed-point decimal using i64 (multiply by 10,000)
/// Represents monetary values with 4 decimal places of precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    const SCALE: i64 = 10_000;
    const DECIMALS: usize = 4;

    /// Zero value
    pub const ZERO: Money = Money(0);

    /// Create from raw scaled value (for internal use)
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Get raw scaled value
    pub fn raw(&self) -> i64 {
        self.0
    }

    /// Parse from decimal string (e.g., "599.98")
    ///
    /// Digits beyond the fourth decimal place are rounded half away from zero.
    pub fn from_decimal_str(s: &str) -> Result<Self, DomainError> {
        let s = s.trim();

        let (is_negative, s) = match s.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let (integer_part, decimal_part) = match s.split_once('.') {
            Some((int, dec)) => (int, dec),
            None => (s, ""),
        };

        if integer_part.is_empty() && decimal_part.is_empty() {
            return Err(DomainError::InvalidAmount);
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(integer_part) || !all_digits(decimal_part) {
            return Err(DomainError::InvalidAmount);
        }

        let integer: i64 = if integer_part.is_empty() {
            0
        } else {
            integer_part
                .parse()
                .map_err(|_| DomainError::Overflow)?
        };

        let kept = &decimal_part[..decimal_part.len().min(Self::DECIMALS)];
        let mut decimal: i64 = format!("{:0<4}", kept)
            .parse()
            .map_err(|_| DomainError::InvalidAmount)?;

        // Round on the first discarded digit
        if decimal_part.len() > Self::DECIMALS && decimal_part.as_bytes()[Self::DECIMALS] >= b'5' {
            decimal += 1;
        }

        let scaled = integer
            .checked_mul(Self::SCALE)
            .and_then(|v| v.checked_add(decimal))
            .ok_or(DomainError::Overflow)?;

        Ok(Self(if is_negative { -scaled } else { scaled }))
    }

    /// Convert to decimal string with 4 decimal places
    pub fn to_decimal_string(&self) -> String {
        let abs_value = self.0.unsigned_abs();
        let scale = Self::SCALE as u64;
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:04}", sign, abs_value / scale, abs_value % scale)
    }

    /// Checked addition, returns None on overflow
    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Check whether the value is below zero
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Lossy conversion used for the JSON wire format
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// Inverse of [`Money::as_f64`], rounding to the nearest representable value
    pub fn from_f64(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() {
            return Err(DomainError::InvalidAmount);
        }
        let scaled = (value * Self::SCALE as f64).round();
        if scaled >= i64::MAX as f64 || scaled <= i64::MIN as f64 {
            return Err(DomainError::Overflow);
        }
        Ok(Self(scaled as i64))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

/// Accepted JSON forms; plain numbers come from older cache files
#[derive(Deserialize)]
#[serde(untagged)]
enum MoneyRepr {
    Text(String),
    Number(f64),
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match MoneyRepr::deserialize(deserializer)? {
            MoneyRepr::Text(text) => Money::from_decimal_str(&text),
            MoneyRepr::Number(value) => Money::from_f64(value),
        }
        .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_integers() {
        assert_eq!(Money::from_decimal_str("1").unwrap(), Money(10_000));
        assert_eq!(Money::from_decimal_str("10").unwrap(), Money(100_000));
        assert_eq!(Money::from_decimal_str("0").unwrap(), Money(0));
    }

    #[test]
    fn parse_decimals() {
        assert_eq!(Money::from_decimal_str("1.5").unwrap(), Money(15_000));
        assert_eq!(Money::from_decimal_str("299.99").unwrap(), Money(2_999_900));
        assert_eq!(Money::from_decimal_str("0.0001").unwrap(), Money(1));
        assert_eq!(Money::from_decimal_str(".25").unwrap(), Money(2_500));
        assert_eq!(Money::from_decimal_str("7.").unwrap(), Money(70_000));
    }

    #[test]
    fn parse_rounds_extra_decimals() {
        assert_eq!(Money::from_decimal_str("1.00004").unwrap(), Money(10_000));
        assert_eq!(Money::from_decimal_str("1.00005").unwrap(), Money(10_001));
        assert_eq!(Money::from_decimal_str("0.99995").unwrap(), Money(10_000));
        assert_eq!(Money::from_decimal_str("-1.23456").unwrap(), Money(-12_346));
    }

    #[test]
    fn parse_signs_and_whitespace() {
        assert_eq!(Money::from_decimal_str("  1.5  ").unwrap(), Money(15_000));
        assert_eq!(Money::from_decimal_str("+2").unwrap(), Money(20_000));
        assert_eq!(Money::from_decimal_str("-1.5").unwrap(), Money(-15_000));
    }

    #[test]
    fn reject_invalid_formats() {
        assert!(Money::from_decimal_str("").is_err());
        assert!(Money::from_decimal_str(".").is_err());
        assert!(Money::from_decimal_str("abc").is_err());
        assert!(Money::from_decimal_str("1.2.3").is_err());
        assert!(Money::from_decimal_str("1e5").is_err());
        assert!(Money::from_decimal_str("--1").is_err());
    }

    #[test]
    fn reject_overflow() {
        assert_eq!(
            Money::from_decimal_str("99999999999999999999"),
            Err(DomainError::Overflow)
        );
    }

    #[test]
    fn to_string_formats_correctly() {
        assert_eq!(Money(10_000).to_decimal_string(), "1.0000");
        assert_eq!(Money(1).to_decimal_string(), "0.0001");
        assert_eq!(Money(-15_000).to_decimal_string(), "-1.5000");
        assert_eq!(Money(1_234_567).to_string(), "123.4567");
    }

    #[test]
    fn sum_and_add_assign() {
        let total: Money = [Money(10_000), Money(5_000), Money(1)].into_iter().sum();
        assert_eq!(total, Money(15_001));

        let mut acc = Money::ZERO;
        acc += Money(i64::MAX);
        acc += Money(1);
        assert_eq!(acc, Money(i64::MAX));
    }

    #[test]
    fn json_uses_decimal_strings() {
        let json = serde_json::to_string(&Money(1_500_000)).unwrap();
        assert_eq!(json, "\"150.0000\"");

        let back: Money = serde_json::from_str("\"599.98\"").unwrap();
        assert_eq!(back, Money(5_999_800));
    }

    #[test]
    fn json_accepts_plain_numbers() {
        let back: Money = serde_json::from_str("599.98").unwrap();
        assert_eq!(back, Money(5_999_800));
        assert!(serde_json::from_str::<Money>("\"12abc\"").is_err());
    }

    #[test]
    fn json_round_trip_keeps_every_unit_past_f64_precision() {
        for raw in [i64::MAX, i64::MIN + 1, 9_007_199_254_740_993, -1] {
            let json = serde_json::to_string(&Money(raw)).unwrap();
            let back: Money = serde_json::from_str(&json).unwrap();
            assert_eq!(back, Money(raw));
        }
    }

    #[test]
    fn f64_conversion_is_stable() {
        for raw in [0, 1, 9_999, 5_999_800, 123_456_789_012, -42] {
            let money = Money(raw);
            assert_eq!(Money::from_f64(money.as_f64()).unwrap(), money);
        }
        assert!(Money::from_f64(f64::NAN).is_err());
    }
}
