//! Fixed-point decimal with two fractional digits.
//!
//! Heights and weights are exact decimals (`1.80`, `85.00`); keeping them as
//! integer hundredths avoids float drift in range checks and in the ideal
//! weight formula.

use core::fmt;
use core::str::FromStr;

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use roster_core::ValueObject;

/// Largest magnitude accepted from input, in hundredths.
const MAX_HUNDREDTHS: i64 = 1_000_000_000_000;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecimalError {
    #[error("A valid number is required.")]
    Invalid,
    #[error("Ensure that there are no more than 2 decimal places.")]
    TooManyDecimals,
    #[error("This field may not be null.")]
    Null,
}

/// Decimal value stored as integer hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Centi(i64);

impl ValueObject for Centi {}

impl Centi {
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    pub const fn hundredths(self) -> i64 {
        self.0
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Parse a float coming from JSON.
    ///
    /// Values that need more than two fractional digits are rejected rather
    /// than silently rounded.
    pub fn from_f64(value: f64) -> Result<Self, DecimalError> {
        if !value.is_finite() {
            return Err(DecimalError::Invalid);
        }
        let scaled = value * 100.0;
        if scaled.abs() > MAX_HUNDREDTHS as f64 {
            return Err(DecimalError::Invalid);
        }
        let rounded = scaled.round();
        if (scaled - rounded).abs() > 1e-6 {
            return Err(DecimalError::TooManyDecimals);
        }
        Ok(Self(rounded as i64))
    }
}

impl FromStr for Centi {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, unsigned) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(DecimalError::Invalid);
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(DecimalError::Invalid);
        }

        // Trailing zeros beyond the second place carry no precision.
        let frac_trimmed = if frac_part.len() > 2 {
            let (kept, rest) = frac_part.split_at(2);
            if rest.bytes().any(|b| b != b'0') {
                return Err(DecimalError::TooManyDecimals);
            }
            kept
        } else {
            frac_part
        };

        let int_value: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| DecimalError::Invalid)?
        };
        let frac_value: i64 = match frac_trimmed.len() {
            0 => 0,
            1 => frac_trimmed.parse::<i64>().map_err(|_| DecimalError::Invalid)? * 10,
            _ => frac_trimmed.parse().map_err(|_| DecimalError::Invalid)?,
        };

        let magnitude = int_value
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac_value))
            .filter(|v| *v <= MAX_HUNDREDTHS)
            .ok_or(DecimalError::Invalid)?;

        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl fmt::Display for Centi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Centi {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Centi {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let input = DecimalInput::deserialize(deserializer)?;
        input.parse().map_err(serde::de::Error::custom)
    }
}

/// Raw decimal as received: a JSON number or a decimal string (CSV cells,
/// form posts). `null` and any other JSON type are kept so that validation can
/// report them per field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DecimalInput {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
    Other(IgnoredAny),
}

impl DecimalInput {
    pub fn parse(&self) -> Result<Centi, DecimalError> {
        match self {
            DecimalInput::Integer(v) => v
                .checked_mul(100)
                .filter(|h| h.abs() <= MAX_HUNDREDTHS)
                .map(Centi)
                .ok_or(DecimalError::Invalid),
            DecimalInput::Float(v) => Centi::from_f64(*v),
            DecimalInput::Text(s) => s.parse(),
            DecimalInput::Null => Err(DecimalError::Null),
            DecimalInput::Other(_) => Err(DecimalError::Invalid),
        }
    }

    /// Blank text counts as an absent value.
    pub fn is_blank(&self) -> bool {
        matches!(self, DecimalInput::Text(s) if s.trim().is_empty())
    }
}

impl From<&str> for DecimalInput {
    fn from(value: &str) -> Self {
        DecimalInput::Text(value.to_string())
    }
}

impl From<f64> for DecimalInput {
    fn from(value: f64) -> Self {
        DecimalInput::Float(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> Result<Centi, DecimalError> {
        s.parse()
    }

    #[test]
    fn parses_plain_decimals() {
        assert_eq!(c("1.80"), Ok(Centi::from_hundredths(180)));
        assert_eq!(c("1.8"), Ok(Centi::from_hundredths(180)));
        assert_eq!(c("85"), Ok(Centi::from_hundredths(8500)));
        assert_eq!(c(".5"), Ok(Centi::from_hundredths(50)));
        assert_eq!(c(" 2.50 "), Ok(Centi::from_hundredths(250)));
        assert_eq!(c("-44.70"), Ok(Centi::from_hundredths(-4470)));
        assert_eq!(c("1.800"), Ok(Centi::from_hundredths(180)));
    }

    #[test]
    fn rejects_garbage_and_extra_precision() {
        assert_eq!(c(""), Err(DecimalError::Invalid));
        assert_eq!(c("."), Err(DecimalError::Invalid));
        assert_eq!(c("1,80"), Err(DecimalError::Invalid));
        assert_eq!(c("abc"), Err(DecimalError::Invalid));
        assert_eq!(c("1.2.3"), Err(DecimalError::Invalid));
        assert_eq!(c("1.805"), Err(DecimalError::TooManyDecimals));
    }

    #[test]
    fn floats_from_json_are_exact_to_two_places() {
        assert_eq!(Centi::from_f64(1.8), Ok(Centi::from_hundredths(180)));
        assert_eq!(Centi::from_f64(85.0), Ok(Centi::from_hundredths(8500)));
        assert_eq!(Centi::from_f64(0.29), Ok(Centi::from_hundredths(29)));
        assert_eq!(Centi::from_f64(1.805), Err(DecimalError::TooManyDecimals));
        assert_eq!(Centi::from_f64(f64::NAN), Err(DecimalError::Invalid));
    }

    #[test]
    fn displays_two_fraction_digits() {
        assert_eq!(Centi::from_hundredths(180).to_string(), "1.80");
        assert_eq!(Centi::from_hundredths(5).to_string(), "0.05");
        assert_eq!(Centi::from_hundredths(-1234).to_string(), "-12.34");
    }

    #[test]
    fn serde_accepts_numbers_and_strings() {
        let from_num: Centi = serde_json::from_str("1.8").unwrap();
        let from_int: Centi = serde_json::from_str("85").unwrap();
        let from_str: Centi = serde_json::from_str("\"1.80\"").unwrap();
        assert_eq!(from_num, from_str);
        assert_eq!(from_int, Centi::from_hundredths(8500));
        assert_eq!(serde_json::to_value(from_num).unwrap(), "1.80");
    }

    #[test]
    fn null_and_non_numeric_json_are_kept_for_validation() {
        let null: DecimalInput = serde_json::from_str("null").unwrap();
        let flag: DecimalInput = serde_json::from_str("true").unwrap();
        assert_eq!(null.parse(), Err(DecimalError::Null));
        assert_eq!(flag.parse(), Err(DecimalError::Invalid));
    }
}
