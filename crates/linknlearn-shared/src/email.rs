//! Institutional email validation.
//!
//! Sign-up is restricted to roll-number addresses of the form
//! `23eg105b04@anurag.edu.in`: two digits, two lowercase letters, three
//! digits, one lowercase letter, two digits, at the institutional domain.

use crate::constants::INSTITUTIONAL_DOMAIN;
use crate::error::SharedError;

/// Check whether `email` is a well-formed institutional address.
pub fn is_institutional(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    domain == INSTITUTIONAL_DOMAIN && matches_roll_number(local)
}

/// Validate an institutional address, normalizing to lowercase.
pub fn validate(email: &str) -> Result<String, SharedError> {
    let email = email.trim().to_ascii_lowercase();
    if is_institutional(&email) {
        Ok(email)
    } else {
        Err(SharedError::InvalidEmail)
    }
}

/// Roll-number shape: `NN aa NNN a NN` (10 characters).
fn matches_roll_number(local: &str) -> bool {
    let bytes = local.as_bytes();
    if bytes.len() != 10 {
        return false;
    }
    let digit = |b: u8| b.is_ascii_digit();
    let lower = |b: u8| b.is_ascii_lowercase();

    digit(bytes[0])
        && digit(bytes[1])
        && lower(bytes[2])
        && lower(bytes[3])
        && digit(bytes[4])
        && digit(bytes[5])
        && digit(bytes[6])
        && lower(bytes[7])
        && digit(bytes[8])
        && digit(bytes[9])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_roll_number_addresses() {
        assert!(is_institutional("23eg105b04@anurag.edu.in"));
        assert!(is_institutional("99zz999z99@anurag.edu.in"));
    }

    #[test]
    fn rejects_other_domains() {
        assert!(!is_institutional("23eg105b04@gmail.com"));
        assert!(!is_institutional("23eg105b04@anurag.edu.in.evil.com"));
    }

    #[test]
    fn rejects_malformed_local_parts() {
        assert!(!is_institutional("23eg105b0@anurag.edu.in")); // too short
        assert!(!is_institutional("23EG105B04@anurag.edu.in")); // uppercase
        assert!(!is_institutional("ab23105b04@anurag.edu.in")); // wrong classes
        assert!(!is_institutional("@anurag.edu.in"));
        assert!(!is_institutional("no-at-sign"));
    }

    #[test]
    fn validate_normalizes_case_and_whitespace() {
        let ok = validate("  23EG105B04@Anurag.edu.in ").unwrap();
        assert_eq!(ok, "23eg105b04@anurag.edu.in");
        assert!(validate("someone@else.edu").is_err());
    }
}
