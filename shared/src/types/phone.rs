//! Canonical phone number type
//!
//! Every phone number entering the system is canonicalized to E.164 before it
//! is stored, compared or used as a lookup key. `PhoneNumber` enforces this at
//! construction: the only ways to obtain one are strict E.164 validation
//! (`TryFrom<String>`, used by serde) or lenient ingress parsing with a
//! default country code (`PhoneNumber::parse`).

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// E.164 format: + followed by 8 to 15 digits, first digit non-zero
static E164_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9]\d{7,14}$").expect("Invalid E.164 regex pattern"));

/// Separators tolerated in user-supplied numbers
static SEPARATOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-\(\)\.]").expect("Invalid separator regex pattern"));

/// Prefix added by WhatsApp gateways to the sender field
const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Errors produced while canonicalizing a phone number
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneParseError {
    /// Input was empty after trimming separators
    #[error("phone number is empty")]
    Empty,

    /// Input contained characters other than digits, separators and a leading +
    #[error("phone number contains invalid characters: {0}")]
    InvalidCharacters(String),

    /// Input did not normalize to a valid E.164 number
    #[error("phone number is not a valid E.164 number: {0}")]
    InvalidFormat(String),
}

/// A phone number in canonical E.164 form
///
/// Serialized as its E.164 string; deserialization rejects anything that is
/// not already canonical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Canonicalize a user-supplied phone number.
    ///
    /// Accepts E.164 input, the `00` international prefix, and bare national
    /// numbers (10 digits) which get the default country code prepended.
    /// Longer bare digit runs are assumed to already carry a country code.
    pub fn parse(input: &str, default_country_code: &str) -> Result<Self, PhoneParseError> {
        let stripped = SEPARATOR_REGEX.replace_all(input.trim(), "");
        if stripped.is_empty() {
            return Err(PhoneParseError::Empty);
        }

        let candidate = if let Some(rest) = stripped.strip_prefix('+') {
            format!("+{}", rest)
        } else if let Some(rest) = stripped.strip_prefix("00") {
            format!("+{}", rest)
        } else {
            let digits: &str = &stripped;
            if !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(PhoneParseError::InvalidCharacters(input.to_string()));
            }
            if digits.len() == 10 {
                format!("+{}{}", default_country_code, digits)
            } else {
                format!("+{}", digits)
            }
        };

        if candidate[1..].chars().any(|c| !c.is_ascii_digit()) {
            return Err(PhoneParseError::InvalidCharacters(input.to_string()));
        }
        if !E164_REGEX.is_match(&candidate) {
            return Err(PhoneParseError::InvalidFormat(candidate));
        }

        Ok(PhoneNumber(candidate))
    }

    /// Canonicalize the sender field of a WhatsApp gateway webhook
    /// (`whatsapp:+5255...`).
    pub fn from_whatsapp(raw: &str, default_country_code: &str) -> Result<Self, PhoneParseError> {
        let trimmed = raw.trim();
        let without_prefix = trimmed.strip_prefix(WHATSAPP_PREFIX).unwrap_or(trimmed);
        Self::parse(without_prefix, default_country_code)
    }

    /// The canonical E.164 representation
    pub fn as_e164(&self) -> &str {
        &self.0
    }

    /// Masked form for logs and user-visible messages, keeping the last
    /// four digits: `****7890`
    pub fn masked(&self) -> String {
        if self.0.len() <= 4 {
            "****".to_string()
        } else {
            format!("****{}", &self.0[self.0.len() - 4..])
        }
    }

    /// SHA-256 hex digest of the E.164 form, used as a privacy-preserving
    /// key component in Redis and in audit records
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if E164_REGEX.is_match(&value) {
            Ok(PhoneNumber(value))
        } else {
            Err(PhoneParseError::InvalidFormat(value))
        }
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_e164_input_unchanged() {
        let phone = PhoneNumber::parse("+521234567890", "52").unwrap();
        assert_eq!(phone.as_e164(), "+521234567890");
    }

    #[test]
    fn prepends_default_country_code_to_national_numbers() {
        let phone = PhoneNumber::parse("5512345678", "52").unwrap();
        assert_eq!(phone.as_e164(), "+525512345678");
    }

    #[test]
    fn converts_international_double_zero_prefix() {
        let phone = PhoneNumber::parse("00521234567890", "52").unwrap();
        assert_eq!(phone.as_e164(), "+521234567890");
    }

    #[test]
    fn strips_separators() {
        let phone = PhoneNumber::parse("+52 (55) 1234-56.78", "52").unwrap();
        assert_eq!(phone.as_e164(), "+525512345678");
    }

    #[test]
    fn strips_whatsapp_prefix() {
        let phone = PhoneNumber::from_whatsapp("whatsapp:+521234567890", "52").unwrap();
        assert_eq!(phone.as_e164(), "+521234567890");
    }

    #[test]
    fn treats_long_digit_runs_as_already_prefixed() {
        let phone = PhoneNumber::parse("521234567890", "52").unwrap();
        assert_eq!(phone.as_e164(), "+521234567890");
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(PhoneNumber::parse("  ", "52"), Err(PhoneParseError::Empty));
    }

    #[test]
    fn rejects_letters() {
        assert!(matches!(
            PhoneNumber::parse("+52abc1234567", "52"),
            Err(PhoneParseError::InvalidCharacters(_))
        ));
    }

    #[test]
    fn rejects_leading_zero_country_code() {
        assert!(matches!(
            PhoneNumber::parse("+0123456789", "52"),
            Err(PhoneParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn masks_all_but_last_four_digits() {
        let phone = PhoneNumber::parse("+521234567890", "52").unwrap();
        assert_eq!(phone.masked(), "****7890");
    }

    #[test]
    fn digest_is_stable_and_hex_encoded() {
        let a = PhoneNumber::parse("+521234567890", "52").unwrap();
        let b = PhoneNumber::parse("52 1234 567 890", "52").unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
        assert!(a.digest().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn strict_deserialization_rejects_non_canonical_input() {
        let ok: Result<PhoneNumber, _> = serde_json::from_str(r#""+521234567890""#);
        assert!(ok.is_ok());

        let not_canonical: Result<PhoneNumber, _> = serde_json::from_str(r#""5512345678""#);
        assert!(not_canonical.is_err());
    }
}
