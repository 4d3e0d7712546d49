//! Phone number normalization for call forwarding and follow-up SMS.
//!
//! Numbers come from configuration and from telephony webhooks (`From`,
//! `caller` stream parameter). Formatting characters people commonly type
//! (spaces, dashes, dots, parentheses) are stripped; what remains must be
//! digits with an optional leading `+`.

/// Validates and normalizes a phone number.
///
/// # Validation Rules
///
/// - Must not be empty (after trimming whitespace)
/// - Spaces, `-`, `.`, `(` and `)` are removed
/// - The rest must be digits (`0-9`), with an optional `+` prefix
///
/// # Returns
///
/// - `Ok(String)` - The number with formatting characters removed
/// - `Err(String)` - A human-readable error message
///
/// # Examples
///
/// ```
/// use callrelay::utils::phone_validation::validate_phone_number;
///
/// assert_eq!(validate_phone_number("+1 (555) 010-2000").unwrap(), "+15550102000");
/// assert!(validate_phone_number("123abc").is_err());
/// ```
pub fn validate_phone_number(phone: &str) -> Result<String, String> {
    let trimmed = phone.trim();

    if trimmed.is_empty() {
        return Err("Phone number cannot be empty".to_string());
    }

    let compact: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    let digits_part = compact.strip_prefix('+').unwrap_or(&compact);

    if digits_part.is_empty() {
        return Err("Phone number must contain at least one digit".to_string());
    }

    if let Some((i, ch)) = digits_part
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
    {
        if ch == '+' {
            return Err(format!(
                "Invalid character '+' at position {i} - plus sign is only allowed at the beginning"
            ));
        }
        return Err(format!(
            "Invalid character '{ch}' at position {i} - only digits and an optional leading '+' are allowed"
        ));
    }

    Ok(compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_numbers() {
        assert_eq!(validate_phone_number("+15550102000").unwrap(), "+15550102000");
        assert_eq!(validate_phone_number("  07123456789 ").unwrap(), "07123456789");
        assert_eq!(validate_phone_number("1234").unwrap(), "1234");
    }

    #[test]
    fn test_formatting_characters_removed() {
        assert_eq!(
            validate_phone_number("+1 (555) 010-2000").unwrap(),
            "+15550102000"
        );
        assert_eq!(validate_phone_number("555.010.2000").unwrap(), "5550102000");
    }

    #[test]
    fn test_invalid_empty() {
        let result = validate_phone_number("   ");
        assert_eq!(result.unwrap_err(), "Phone number cannot be empty");
    }

    #[test]
    fn test_invalid_plus_only() {
        let result = validate_phone_number("+ ( )");
        assert_eq!(
            result.unwrap_err(),
            "Phone number must contain at least one digit"
        );
    }

    #[test]
    fn test_invalid_plus_not_at_beginning() {
        let result = validate_phone_number("1+234");
        assert!(
            result
                .unwrap_err()
                .contains("plus sign is only allowed at the beginning")
        );
    }

    #[test]
    fn test_invalid_letters() {
        let result = validate_phone_number("555-CALL-NOW");
        assert!(result.unwrap_err().contains("Invalid character 'C'"));
    }

    #[test]
    fn test_anonymous_caller_rejected() {
        // Withheld numbers arrive as words, never as digits
        assert!(validate_phone_number("anonymous").is_err());
    }
}
