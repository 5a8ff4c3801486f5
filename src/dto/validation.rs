//! Validation helpers for DTOs.

use validator::{ValidateEmail, ValidationError};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;
const DISPLAY_NAME_MAX: usize = 50;

/// Emails are compared and stored trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates an email the way it will be stored, so surrounding whitespace is tolerated.
pub fn validate_email_address(email: &str) -> Result<(), ValidationError> {
    if normalize_email(email).validate_email() {
        Ok(())
    } else {
        let mut err = ValidationError::new("email");
        err.message = Some("a valid email is required".into());
        Err(err)
    }
}

/// Validates a display name after trimming: 1 to 50 characters.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let len = name.trim().chars().count();
    if (1..=DISPLAY_NAME_MAX).contains(&len) {
        return Ok(());
    }
    let mut err = ValidationError::new("name_length");
    err.message = Some(format!("name must be 1 to {DISPLAY_NAME_MAX} characters").into());
    Err(err)
}

/// Validates a gamer tag: 3 to 30 ASCII letters, digits, `_` or `-`.
///
/// An empty value is accepted and means "clear the gamer tag".
///
/// # Examples
///
/// ```ignore
/// validate_username("snake_master") // Ok
/// validate_username("")             // Ok - clears
/// validate_username("ab")           // Err - too short
/// validate_username("no spaces")    // Err - invalid character
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Ok(());
    }

    let len = trimmed.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        let mut err = ValidationError::new("username_length");
        err.message = Some(
            format!("Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters (got {len})")
                .into(),
        );
        return Err(err);
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        let mut err = ValidationError::new("username_format");
        err.message =
            Some("Username may only contain letters, digits, underscores and hyphens".into());
        return Err(err);
    }

    Ok(())
}

/// Reports a missing or blank required field.
pub fn required(field: &'static str) -> ValidationError {
    let mut err = ValidationError::new("required");
    err.message = Some(format!("{field} is required").into());
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username_valid() {
        assert!(validate_username("ace").is_ok());
        assert!(validate_username("snake_master-99").is_ok());
        assert!(validate_username("").is_ok()); // clears
        assert!(validate_username("   ").is_ok()); // clears
    }

    #[test]
    fn test_validate_username_invalid_length() {
        assert!(validate_username("ab").is_err()); // too short
        assert!(validate_username(&"x".repeat(31)).is_err()); // too long
    }

    #[test]
    fn test_validate_username_invalid_format() {
        assert!(validate_username("no spaces").is_err());
        assert!(validate_username("émile").is_err());
        assert!(validate_username("semi;colon").is_err());
    }

    #[test]
    fn test_validate_email_address_ignores_padding() {
        assert!(validate_email_address("  Ada@Example.com ").is_ok());
        assert!(validate_email_address("not-an-email").is_err());
        assert!(validate_email_address("   ").is_err());
        assert_eq!(normalize_email("  Ada@Example.com "), "ada@example.com");
    }

    #[test]
    fn test_validate_display_name_trims() {
        assert!(validate_display_name(" Ada ").is_ok());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name(&format!("  {}  ", "x".repeat(50))).is_ok());
        assert!(validate_display_name(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_required_message() {
        let err = required("gameKey");
        assert_eq!(err.code, "required");
        assert_eq!(err.message.as_deref(), Some("gameKey is required"));
    }
}
