//! Input validation shared by services.

use crate::error::{RaffleError, Result};
use rust_decimal::Decimal;

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Validate email address format.
///
/// Basic structural check:
/// - exactly one `@`
/// - non-empty local and domain parts, domain containing a dot
/// - 3 to 255 characters, no whitespace
///
/// # Examples
///
/// ```
/// use raffle_core::validation::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(is_valid_email("user+tag@sub.example.com"));
/// assert!(!is_valid_email("invalid"));
/// assert!(!is_valid_email("@example.com"));
/// assert!(!is_valid_email("user@"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 || email.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Validate an email, returning a validation error.
///
/// # Errors
///
/// Returns [`RaffleError::Validation`] if the email is malformed.
pub fn validate_email(email: &str) -> Result<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(RaffleError::Validation(format!("invalid email: {email}")))
    }
}

/// Validate a new password.
///
/// # Errors
///
/// Returns [`RaffleError::Validation`] if shorter than [`MIN_PASSWORD_LEN`].
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(RaffleError::Validation(format!(
            "password must have at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a required text field and return it trimmed.
///
/// # Errors
///
/// Returns [`RaffleError::Validation`] if blank.
pub fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RaffleError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Validate reward sale terms.
///
/// # Errors
///
/// Returns [`RaffleError::Validation`] if the price is negative or the
/// minimum quota is below 1.
pub fn validate_terms(price: Option<Decimal>, min_quota: Option<i32>) -> Result<()> {
    if price.is_some_and(|p| p.is_sign_negative() && !p.is_zero()) {
        return Err(RaffleError::Validation("price cannot be negative".to_string()));
    }
    if min_quota.is_some_and(|q| q < 1) {
        return Err(RaffleError::Validation("min_quota must be at least 1".to_string()));
    }
    Ok(())
}

/// Drop blank image URLs and trim the rest.
#[must_use]
pub fn clean_images(images: Vec<String>) -> Vec<String> {
    images
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_two_at_signs() {
        assert!(!is_valid_email("a@b@c.com"));
    }

    #[test]
    fn rejects_dotless_domain() {
        assert!(!is_valid_email("user@localhost"));
    }

    #[test]
    fn password_length_counts_characters() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password("çãõéíú").is_ok());
    }

    #[test]
    fn required_trims() {
        assert_eq!(required("name", "  Bike  ").ok().as_deref(), Some("Bike"));
        assert!(required("name", "   ").is_err());
    }

    #[test]
    fn terms_validation() {
        assert!(validate_terms(Some(Decimal::new(-1, 2)), None).is_err());
        assert!(validate_terms(Some(Decimal::ZERO), Some(1)).is_ok());
        assert!(validate_terms(None, Some(0)).is_err());
    }

    #[test]
    fn blank_images_are_dropped() {
        let images = clean_images(vec![" a.png ".into(), String::new(), "  ".into(), "b.png".into()]);
        assert_eq!(images, vec!["a.png".to_string(), "b.png".to_string()]);
    }
}
