//! # Phone Number Normalization
//!
//! Kenyan mobile numbers in the forms users actually type
//! (`0712345678`, `+254712345678`, `254712345678`, `712345678`) all
//! normalize to the same canonical `254XXXXXXXXX` form. Anything that
//! does not normalize to a valid mobile number is rejected.

use serde::{Deserialize, Serialize};
use soko_core::{StoreError, StoreResult};

/// Country calling prefix (Kenya)
pub const COUNTRY_PREFIX: &str = "254";

/// Domestic trunk prefix replaced by the country prefix
pub const TRUNK_PREFIX: char = '0';

/// Leading digits of valid mobile ranges (07xx and 01xx series)
pub const VALID_LEAD_DIGITS: [char; 2] = ['7', '1'];

/// Canonical length: country prefix + lead digit + 8 more digits
pub const CANONICAL_LENGTH: usize = 12;

/// A validated, canonical mobile number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalize raw user input into the canonical form.
    ///
    /// Strips non-digits, then:
    /// - a number starting with the country prefix is used as-is,
    ///   truncated to the canonical length;
    /// - a leading trunk `0` is replaced by the country prefix;
    /// - a bare number starting with a valid mobile lead digit is assumed
    ///   domestic and prefixed.
    ///
    /// Fails with `InvalidPhoneNumber` when the result is not
    /// `254` + valid lead digit + 8 digits.
    pub fn normalize(input: &str) -> StoreResult<Self> {
        let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

        let candidate: String = if digits.starts_with(COUNTRY_PREFIX) {
            digits.chars().take(CANONICAL_LENGTH).collect()
        } else if let Some(rest) = digits.strip_prefix(TRUNK_PREFIX) {
            format!("{COUNTRY_PREFIX}{rest}")
        } else if digits
            .chars()
            .next()
            .map(|c| VALID_LEAD_DIGITS.contains(&c))
            .unwrap_or(false)
        {
            format!("{COUNTRY_PREFIX}{digits}")
        } else {
            digits
        };

        if Self::is_canonical(&candidate) {
            Ok(Self(candidate))
        } else {
            Err(StoreError::InvalidPhoneNumber {
                input: input.to_string(),
            })
        }
    }

    fn is_canonical(candidate: &str) -> bool {
        candidate.len() == CANONICAL_LENGTH
            && candidate.starts_with(COUNTRY_PREFIX)
            && candidate
                .chars()
                .nth(COUNTRY_PREFIX.len())
                .map(|c| VALID_LEAD_DIGITS.contains(&c))
                .unwrap_or(false)
            && candidate.chars().all(|c| c.is_ascii_digit())
    }

    /// The canonical form, e.g. "254712345678"
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_input_forms_normalize_identically() {
        let forms = ["0712345678", "+254712345678", "254712345678", "712345678"];
        for form in forms {
            let phone = PhoneNumber::normalize(form).unwrap();
            assert_eq!(phone.as_str(), "254712345678", "input: {form}");
        }
    }

    #[test]
    fn test_01xx_series_accepted() {
        let phone = PhoneNumber::normalize("0112345678").unwrap();
        assert_eq!(phone.as_str(), "254112345678");
    }

    #[test]
    fn test_invalid_lead_digit_rejected() {
        let err = PhoneNumber::normalize("0812345678").unwrap_err();
        assert!(matches!(err, StoreError::InvalidPhoneNumber { .. }));
    }

    #[test]
    fn test_too_short_rejected() {
        assert!(PhoneNumber::normalize("07123").is_err());
        assert!(PhoneNumber::normalize("").is_err());
    }

    #[test]
    fn test_overlong_country_form_truncated() {
        // Extra trailing digits after a full country-prefixed number are cut
        let phone = PhoneNumber::normalize("2547123456789").unwrap();
        assert_eq!(phone.as_str(), "254712345678");
    }

    #[test]
    fn test_punctuation_stripped() {
        let phone = PhoneNumber::normalize("+254 712-345 678").unwrap();
        assert_eq!(phone.as_str(), "254712345678");
    }

    #[test]
    fn test_non_mobile_rejected() {
        // Nairobi landline prefix is not a mobile range
        assert!(PhoneNumber::normalize("0203456789").is_err());
    }
}
