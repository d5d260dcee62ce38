// models/src/errors.rs

pub use thiserror::Error;

/// A field-level validation failure on an inbound record.
///
/// The `Display` text is user facing: it ends up in the `message` field of
/// the HTTP envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was missing or blank.
    #[error("Please add a {0}")]
    Required(&'static str),
    /// A field exceeded its maximum length (in characters).
    #[error("{field} cannot be more than {max} characters")]
    TooLong { field: &'static str, max: usize },
    /// The email address does not match the accepted pattern.
    #[error("Please provide a valid email address")]
    InvalidEmail,
    /// The password is shorter than the minimum length.
    #[error("Password must be at least {0} characters long")]
    PasswordTooShort(usize),
    /// A review rating outside of 1..=5.
    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),
    /// A date that is neither `YYYY-MM-DD` nor RFC 3339.
    #[error("invalid date format: {0}")]
    InvalidDateFormat(String),
    /// An identifier that is not a UUID.
    #[error("Invalid {kind} ID format: '{value}'. IDs are UUIDs such as 67e55044-10b1-426f-9247-bb680e5fe0c8")]
    InvalidId { kind: &'static str, value: String },
    /// A value outside of a closed set (status, role).
    #[error("'{value}' is not a valid {field}")]
    InvalidEnumValue { field: &'static str, value: String },
    /// A numeric field out of its allowed range.
    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },
}

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Rejects blank values after trimming and returns the trimmed text.
pub fn require_text(field: &'static str, value: &str) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(trimmed.to_string())
}

/// Length check counted in characters, not bytes.
pub fn check_max_len(field: &'static str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_reject_blank_text() {
        assert_eq!(require_text("name", "   "), Err(ValidationError::Required("name")));
        assert_eq!(require_text("name", "  Ann ").unwrap(), "Ann");
    }

    #[test]
    fn should_count_characters_not_bytes() {
        let accented = "é".repeat(500);
        assert!(accented.len() > 500);
        assert!(check_max_len("Reason", &accented, 500).is_ok());
        assert_eq!(
            check_max_len("Reason", &"a".repeat(501), 500),
            Err(ValidationError::TooLong { field: "Reason", max: 500 })
        );
    }
}
