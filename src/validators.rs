/// Input validators for the session endpoints.
///
/// Length limits first (cheap DoS guard), then format.
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 64;

lazy_static! {
    // Portal account names: letters, digits, dot, underscore, dash.
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9._-]+$").unwrap();
}

/// Validates a login username
/// - Verifies length constraints
/// - Restricts the character set
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }

    if trimmed.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort(
            "username".to_string(),
            MIN_USERNAME_LENGTH,
        ));
    }

    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong(
            "username".to_string(),
            MAX_USERNAME_LENGTH,
        ));
    }

    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_usernames() {
        assert_eq!(is_valid_username("brgy_clerk").unwrap(), "brgy_clerk");
        assert_eq!(is_valid_username("  captain.2024  ").unwrap(), "captain.2024");
    }

    #[test]
    fn rejects_empty_and_short_usernames() {
        assert!(is_valid_username("").is_err());
        assert!(is_valid_username("ab").is_err());
    }

    #[test]
    fn rejects_oversized_usernames() {
        let long = "a".repeat(MAX_USERNAME_LENGTH + 1);
        assert!(is_valid_username(&long).is_err());
    }

    #[test]
    fn rejects_forbidden_characters() {
        assert!(is_valid_username("clerk; DROP TABLE accounts").is_err());
        assert!(is_valid_username("clerk name").is_err());
    }
}
