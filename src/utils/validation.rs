use validator::ValidationError;

/// Russian-style phone numbers: exactly 11 digits, optional leading `+`.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if digits.is_empty() {
        return Ok(());
    }
    if digits.len() != 11 || !digits.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("phone");
        err.message = Some("Phone must contain exactly 11 digits".into());
        return Err(err);
    }
    Ok(())
}

/// `#` followed by 3 or 6 hex digits.
pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    let valid = color
        .strip_prefix('#')
        .map(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("color");
        err.message = Some("Color must be in HEX format, e.g. #FF5733".into());
        Err(err)
    }
}

/// Strips the optional `+` so phones are stored as bare digits.
pub fn normalize_phone(phone: &str) -> String {
    phone.trim().trim_start_matches('+').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_rules() {
        assert!(validate_phone("79161234567").is_ok());
        assert!(validate_phone("+79161234567").is_ok());
        assert!(validate_phone("").is_ok());
        assert!(validate_phone("7916123456").is_err());
        assert!(validate_phone("7916123456a").is_err());
        assert_eq!(normalize_phone(" +79161234567"), "79161234567");
    }
}
