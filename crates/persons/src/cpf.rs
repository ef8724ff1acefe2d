//! CPF (Brazilian taxpayer id) normalization and checksum validation.
//!
//! A CPF is 11 digits: 9 base digits followed by two check digits, each
//! computed as a weighted sum mod 11 over the digits before it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use roster_core::ValueObject;

/// Number of digits in a normalized CPF.
pub const CPF_LEN: usize = 11;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CpfError {
    /// Not exactly 11 digits once punctuation is stripped.
    #[error("CPF must contain exactly 11 digits.")]
    InvalidFormat,
    /// Repeated digits or a check digit mismatch.
    #[error("Invalid CPF.")]
    InvalidChecksum,
}

/// Strip every non-digit, then verify length and both check digits.
///
/// Returns the bare 11-digit string (no formatting).
pub fn normalize_and_validate(raw: &str) -> Result<String, CpfError> {
    let digits: Vec<u8> = raw
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| d as u8)
        .collect();

    if digits.len() != CPF_LEN {
        return Err(CpfError::InvalidFormat);
    }

    if digits.iter().all(|&d| d == digits[0]) {
        return Err(CpfError::InvalidChecksum);
    }

    for position in 9..CPF_LEN {
        if check_digit(&digits[..position]) != digits[position] {
            return Err(CpfError::InvalidChecksum);
        }
    }

    Ok(digits.iter().map(|d| char::from(b'0' + d)).collect())
}

/// Check digit over `prefix`: weights run from `len + 1` down to 2.
fn check_digit(prefix: &[u8]) -> u8 {
    let top = prefix.len() as u32 + 1;
    let sum: u32 = prefix
        .iter()
        .enumerate()
        .map(|(i, &d)| u32::from(d) * (top - i as u32))
        .sum();
    ((sum * 10) % 11 % 10) as u8
}

/// Both check digits for a 9-digit base.
pub fn check_digits(base: &[u8; 9]) -> (u8, u8) {
    let first = check_digit(base);
    let mut extended = [0u8; 10];
    extended[..9].copy_from_slice(base);
    extended[9] = first;
    (first, check_digit(&extended))
}

/// A validated, normalized CPF.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl ValueObject for Cpf {}

impl Cpf {
    pub fn parse(raw: &str) -> Result<Self, CpfError> {
        normalize_and_validate(raw).map(Self)
    }

    /// Build a valid CPF from 9 base digits (each 0..=9).
    ///
    /// Returns `None` when the result would be a repeated-digit CPF.
    pub fn from_base(base: [u8; 9]) -> Option<Self> {
        let (d1, d2) = check_digits(&base);
        let raw: String = base
            .iter()
            .chain([d1, d2].iter())
            .map(|d| char::from(b'0' + d))
            .collect();
        Self::parse(&raw).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `XXX.XXX.XXX-XX`.
    pub fn formatted(&self) -> String {
        let s = &self.0;
        format!("{}.{}.{}-{}", &s[0..3], &s[3..6], &s[6..9], &s[9..11])
    }
}

impl core::fmt::Display for Cpf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Cpf {
    type Error = CpfError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cpf> for String {
    fn from(value: Cpf) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_valid_cpf_is_normalized() {
        assert_eq!(
            normalize_and_validate("111.444.777-35").unwrap(),
            "11144477735"
        );
    }

    #[test]
    fn known_valid_vectors() {
        for raw in ["52998224725", "529.982.247-25", "39053344705", " 111 444 777 35 "] {
            assert!(normalize_and_validate(raw).is_ok(), "{raw} should be valid");
        }
    }

    #[test]
    fn bad_checksum_is_rejected() {
        assert_eq!(
            normalize_and_validate("11122233344"),
            Err(CpfError::InvalidChecksum)
        );
        // First check digit right, second wrong.
        assert_eq!(
            normalize_and_validate("11144477736"),
            Err(CpfError::InvalidChecksum)
        );
    }

    #[test]
    fn wrong_length_is_format_error() {
        assert_eq!(normalize_and_validate(""), Err(CpfError::InvalidFormat));
        assert_eq!(normalize_and_validate("abc"), Err(CpfError::InvalidFormat));
        assert_eq!(
            normalize_and_validate("111.444.777-3"),
            Err(CpfError::InvalidFormat)
        );
        assert_eq!(
            normalize_and_validate("111.444.777-355"),
            Err(CpfError::InvalidFormat)
        );
    }

    #[test]
    fn error_messages_match_api_contract() {
        assert_eq!(CpfError::InvalidChecksum.to_string(), "Invalid CPF.");
        assert_eq!(
            CpfError::InvalidFormat.to_string(),
            "CPF must contain exactly 11 digits."
        );
    }

    #[test]
    fn check_digits_match_known_cpf() {
        assert_eq!(check_digits(&[1, 1, 1, 4, 4, 4, 7, 7, 7]), (3, 5));
        assert_eq!(check_digits(&[5, 2, 9, 9, 8, 2, 2, 4, 7]), (2, 5));
    }

    #[test]
    fn cpf_value_object_formats_and_serializes() {
        let cpf = Cpf::parse("11144477735").unwrap();
        assert_eq!(cpf.formatted(), "111.444.777-35");
        assert_eq!(serde_json::to_value(&cpf).unwrap(), "11144477735");
        let back: Cpf = serde_json::from_str("\"111.444.777-35\"").unwrap();
        assert_eq!(back, cpf);
        assert!(serde_json::from_str::<Cpf>("\"11122233344\"").is_err());
    }

    #[test]
    fn from_base_rejects_repeated_digits() {
        assert!(Cpf::from_base([0; 9]).is_none());
        assert_eq!(
            Cpf::from_base([1, 1, 1, 4, 4, 4, 7, 7, 7]).unwrap().as_str(),
            "11144477735"
        );
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: 11 identical digits always fail the checksum.
            #[test]
            fn repeated_digits_are_invalid(d in 0u8..10, punct in "[.\\- ]{0,3}") {
                let raw = format!("{}{}", punct, char::from(b'0' + d).to_string().repeat(11));
                prop_assert_eq!(normalize_and_validate(&raw), Err(CpfError::InvalidChecksum));
            }

            /// Property: any digit count other than 11 is a format error.
            #[test]
            fn wrong_digit_count_is_format_error(
                digits in "[0-9]{0,30}".prop_filter("not 11 digits", |s| s.len() != 11),
                sep in "[.\\-/ ]?",
            ) {
                let raw: String = digits.chars().flat_map(|c| [c].into_iter().chain(sep.chars())).collect();
                prop_assert_eq!(normalize_and_validate(&raw), Err(CpfError::InvalidFormat));
            }

            /// Property: generated check digits always validate.
            #[test]
            fn generated_cpfs_validate(base in proptest::array::uniform9(0u8..10)) {
                let (d1, d2) = check_digits(&base);
                let raw: String = base.iter().chain([d1, d2].iter()).map(|d| char::from(b'0' + d)).collect();
                let all_same = raw.chars().all(|c| c == raw.chars().next().unwrap());
                prop_assume!(!all_same);
                prop_assert_eq!(normalize_and_validate(&raw), Ok(raw.clone()));
            }

            /// Property: altering the last digit breaks the checksum.
            #[test]
            fn altered_check_digit_is_rejected(base in proptest::array::uniform9(0u8..10), bump in 1u8..10) {
                let (d1, d2) = check_digits(&base);
                let wrong = (d2 + bump) % 10;
                let raw: String = base.iter().chain([d1, wrong].iter()).map(|d| char::from(b'0' + d)).collect();
                prop_assert!(normalize_and_validate(&raw).is_err());
            }
        }
    }
}
