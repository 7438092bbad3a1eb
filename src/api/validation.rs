//! Input validation for API requests.
//!
//! DTOs derive `validator::Validate`; this module holds the custom rules the
//! derive cannot express and the bridge from `ValidationErrors` to the
//! field-level map carried by `ApiError`.

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

lazy_static! {
    /// At least one letter
    static ref HAS_LETTER_REGEX: Regex = Regex::new(r"[A-Za-z]").unwrap();

    /// At least one digit
    static ref HAS_DIGIT_REGEX: Regex = Regex::new(r"\d").unwrap();
}

/// Password strength rule applied on top of the minimum-length check:
/// must contain at least one letter and one digit.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if !HAS_LETTER_REGEX.is_match(password) || !HAS_DIGIT_REGEX.is_match(password) {
        let mut error = ValidationError::new("password_strength");
        error.message = Some(Cow::from(
            "Password must contain at least one letter and one number",
        ));
        return Err(error);
    }
    Ok(())
}

/// Validate a UUID string used as a path parameter
pub fn validate_uuid(id: &str, field_name: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{} is required", field_name));
    }

    if uuid::Uuid::parse_str(id).is_err() {
        return Err(format!("Invalid {} format", field_name));
    }

    Ok(())
}

/// Flatten derive-produced errors into a field → messages map.
pub fn flatten_errors(errors: &ValidationErrors) -> HashMap<String, Vec<String>> {
    let mut out = HashMap::new();
    for (field, kind) in errors.errors() {
        if let ValidationErrorsKind::Field(field_errors) = kind {
            let messages = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                })
                .collect();
            out.insert(field.to_string(), messages);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("passw0rd").is_ok());
        assert!(validate_password("l3tters4nd").is_ok());

        assert!(validate_password("lettersonly").is_err());
        assert!(validate_password("12345678").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "userId").is_ok());
        assert!(validate_uuid("", "userId").is_err());
        assert!(validate_uuid("not-a-uuid", "userId").is_err());
    }

    #[test]
    fn test_flatten_errors_keeps_messages_per_field() {
        #[derive(Validate)]
        struct Probe {
            #[validate(email(message = "Invalid email address"))]
            email: String,
            #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
            password: String,
        }

        let probe = Probe {
            email: "nope".to_string(),
            password: "short".to_string(),
        };
        let flattened = flatten_errors(&probe.validate().unwrap_err());

        assert_eq!(flattened["email"], vec!["Invalid email address"]);
        assert_eq!(
            flattened["password"],
            vec!["Password must be at least 8 characters"]
        );
    }
}
