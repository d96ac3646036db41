//! Validation helpers for wallet identifiers and confirmation codes

use once_cell::sync::Lazy;
use regex::Regex;

/// Destination account identifiers are CLABE-style digit runs (14 to 20 digits)
static ACCOUNT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{14,20}$").expect("Invalid account regex pattern"));

/// One-time confirmation codes are 4 to 8 digits
static CONFIRMATION_CODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4,8}$").expect("Invalid confirmation code regex pattern"));

/// Check whether a destination account identifier is well-formed
pub fn is_valid_account(account: &str) -> bool {
    ACCOUNT_REGEX.is_match(account.trim())
}

/// Check whether a submitted confirmation code is well-formed
pub fn is_valid_confirmation_code(code: &str) -> bool {
    CONFIRMATION_CODE_REGEX.is_match(code.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_clabe_length_accounts() {
        assert!(is_valid_account("012345678901234567"));
        assert!(is_valid_account("12345678901234"));
        assert!(is_valid_account("  12345678901234567890  "));
    }

    #[test]
    fn rejects_short_long_or_non_numeric_accounts() {
        assert!(!is_valid_account("1234567890123"));
        assert!(!is_valid_account("123456789012345678901"));
        assert!(!is_valid_account("12345678901234a"));
        assert!(!is_valid_account(""));
    }

    #[test]
    fn accepts_four_to_eight_digit_codes() {
        assert!(is_valid_confirmation_code("1234"));
        assert!(is_valid_confirmation_code("123456"));
        assert!(is_valid_confirmation_code("12345678"));
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(!is_valid_confirmation_code("123"));
        assert!(!is_valid_confirmation_code("123456789"));
        assert!(!is_valid_confirmation_code("12a456"));
    }
}
