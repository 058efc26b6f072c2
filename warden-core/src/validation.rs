//! Input validation for registration and login
//!
//! Login paths only check for missing fields; the strength rules apply at
//! registration so existing credentials keep working when the policy tightens.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("Invalid username regex"));

/// Usernames that must never be registered.
const RESERVED_USERNAMES: &[&str] = &["admin", "root", "administrator", "system", "warden"];

/// Substrings that disqualify a password regardless of its other qualities.
const COMMON_PASSWORD_PATTERNS: &[&str] = &[
    "123456", "password", "admin", "qwerty", "letmein", "welcome", "monkey", "dragon",
];

const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Normalize a username for storage and lookup.
///
/// Usernames are case-insensitive; the lowercased form is what gets stored,
/// matched, and recorded in the attempt ledger.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Validates a username for registration
///
/// # Arguments
///
/// * `username` - The username to validate, already normalized
///
/// # Returns
///
/// `Ok(())` when the username is acceptable, otherwise the specific
/// `ValidationError` describing the first failed rule.
///
/// # Examples
///
/// ```
/// use warden_core::validation::validate_username;
///
/// assert!(validate_username("sensor-gw.12").is_ok());
/// assert!(validate_username("ab").is_err());
/// assert!(validate_username("no spaces").is_err());
/// assert!(validate_username("admin").is_err());
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::MissingField("Username is required".to_string()));
    }

    let length = username.chars().count();
    if length < 3 {
        return Err(ValidationError::InvalidUsername(
            "must be at least 3 characters".to_string(),
        ));
    }
    if length > 50 {
        return Err(ValidationError::InvalidUsername(
            "must be at most 50 characters".to_string(),
        ));
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::InvalidUsername(
            "only letters, digits, '.', '_' and '-' are allowed".to_string(),
        ));
    }

    if RESERVED_USERNAMES.contains(&username.to_lowercase().as_str()) {
        return Err(ValidationError::ReservedUsername(username.to_string()));
    }

    Ok(())
}

/// Validates password strength for registration
///
/// # Arguments
///
/// * `password` - The candidate password
///
/// # Returns
///
/// `Ok(())` when the password satisfies every strength rule, otherwise the
/// `ValidationError` for the first rule it fails.
///
/// # Examples
///
/// ```
/// use warden_core::validation::validate_password_strength;
///
/// assert!(validate_password_strength("Tr1cky!gate").is_ok());
/// assert!(validate_password_strength("short1!A").is_ok());
/// assert!(validate_password_strength("alllowercase1!").is_err());
/// assert!(validate_password_strength("Password1!").is_err()); // common pattern
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingField("Password is required".to_string()));
    }

    let length = password.chars().count();
    if length < 8 {
        return Err(ValidationError::InvalidPassword(
            "must be at least 8 characters".to_string(),
        ));
    }
    if length > 128 {
        return Err(ValidationError::InvalidPassword(
            "must be at most 128 characters".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidPassword(
            "must contain an uppercase letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ValidationError::InvalidPassword(
            "must contain a lowercase letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidPassword(
            "must contain a digit".to_string(),
        ));
    }
    if !password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)) {
        return Err(ValidationError::InvalidPassword(
            "must contain a special character".to_string(),
        ));
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORD_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
    {
        return Err(ValidationError::InvalidPassword(
            "contains a common pattern".to_string(),
        ));
    }

    Ok(())
}

/// Checks login input for missing fields only.
///
/// Deliberately weaker than the registration rules: a login attempt with a
/// present-but-weak password must reach password verification, not fail
/// validation.
pub fn validate_login_input(username: &str, password: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::MissingField("Username is required".to_string()));
    }
    if password.is_empty() {
        return Err(ValidationError::MissingField("Password is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  Fleet-Admin.01 "), "fleet-admin.01");
        assert_eq!(normalize_username("gateway"), "gateway");
    }

    #[test]
    fn test_validate_username_valid() {
        assert!(validate_username("gateway").is_ok());
        assert!(validate_username("sensor-gw.12").is_ok());
        assert!(validate_username("device_007").is_ok());
        assert!(validate_username(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn test_validate_username_length() {
        assert!(matches!(
            validate_username("ab"),
            Err(ValidationError::InvalidUsername(_))
        ));
        assert!(matches!(
            validate_username(&"a".repeat(51)),
            Err(ValidationError::InvalidUsername(_))
        ));
        assert!(matches!(
            validate_username(""),
            Err(ValidationError::MissingField(_))
        ));
    }

    #[test]
    fn test_validate_username_charset() {
        assert!(validate_username("bad user").is_err());
        assert!(validate_username("bad@user").is_err());
        assert!(validate_username("badüser").is_err());
    }

    #[test]
    fn test_validate_username_reserved() {
        for reserved in ["admin", "root", "administrator", "system", "warden"] {
            assert!(matches!(
                validate_username(reserved),
                Err(ValidationError::ReservedUsername(_))
            ));
        }
        // Reservation is case-insensitive even for unnormalized input
        assert!(matches!(
            validate_username("Admin"),
            Err(ValidationError::ReservedUsername(_))
        ));
    }

    #[test]
    fn test_validate_password_strength_valid() {
        assert!(validate_password_strength("Tr1cky!gate").is_ok());
        assert!(validate_password_strength("V4lid&Enough").is_ok());
    }

    #[test]
    fn test_validate_password_strength_rules() {
        assert!(validate_password_strength("").is_err());
        assert!(validate_password_strength("Sh0rt!a").is_err());
        assert!(validate_password_strength(&format!("A1!{}", "a".repeat(126))).is_err());
        assert!(validate_password_strength("nocaps1!aa").is_err());
        assert!(validate_password_strength("NOLOWER1!A").is_err());
        assert!(validate_password_strength("NoDigits!!").is_err());
        assert!(validate_password_strength("NoSpecial11").is_err());
    }

    #[test]
    fn test_validate_password_strength_common_patterns() {
        assert!(validate_password_strength("Password1!").is_err());
        assert!(validate_password_strength("Qwerty12!x").is_err());
        assert!(validate_password_strength("xX123456!z").is_err());
    }

    #[test]
    fn test_validate_login_input() {
        assert!(validate_login_input("gateway", "whatever").is_ok());
        assert!(validate_login_input("gateway", "weak").is_ok());
        assert!(validate_login_input("", "whatever").is_err());
        assert!(validate_login_input("   ", "whatever").is_err());
        assert!(validate_login_input("gateway", "").is_err());
    }
}
