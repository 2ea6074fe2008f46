//! Registration password policy.

use core::fmt;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A single requirement of the password policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    MinLength,
    Digit,
    MixedCase,
}

impl PasswordRule {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MinLength => "At least 6 characters",
            Self::Digit => "At least one number (0-9) or a symbol",
            Self::MixedCase => "Lowercase (a-z) and uppercase (A-Z)",
        }
    }
}

/// A password that broke one or more rules, listed in policy order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct PasswordPolicyError {
    pub violations: Vec<PasswordRule>,
}

impl fmt::Display for PasswordPolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.violations.iter().map(|rule| rule.message()).collect();
        f.write_str(&messages.join(", "))
    }
}

/// Check a password against the registration policy.
///
/// # Errors
///
/// Returns every violated rule, not just the first.
pub fn check_password(password: &str) -> Result<(), PasswordPolicyError> {
    let mut violations = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        violations.push(PasswordRule::MinLength);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push(PasswordRule::Digit);
    }
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        violations.push(PasswordRule::MixedCase);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(PasswordPolicyError { violations })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_password() {
        assert!(check_password("Abc123").is_ok());
    }

    #[test]
    fn test_all_violations_are_joined() {
        let err = check_password("abc").unwrap_err();
        assert_eq!(
            err.to_string(),
            "At least 6 characters, At least one number (0-9) or a symbol, Lowercase (a-z) and uppercase (A-Z)"
        );
    }

    #[test]
    fn test_missing_uppercase_only() {
        let err = check_password("abcdef1").unwrap_err();
        assert_eq!(err.violations, vec![PasswordRule::MixedCase]);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let err = check_password("Ää1").unwrap_err();
        assert!(err.violations.contains(&PasswordRule::MinLength));
    }
}
