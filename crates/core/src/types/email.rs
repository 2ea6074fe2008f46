//! Member email addresses.
//!
//! The forum API keys users, memberships and admin checks by email, and
//! memberships specifically by the lowercase form. [`Email`] carries the
//! address as typed (trimmed) and hands out that key on request.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why an address was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must look like name@domain")]
    Malformed,
}

/// A structurally valid address: one `@`, something on both sides, no
/// whitespace. Deliverability is the identity provider's concern.
///
/// ```
/// use vibehive_core::Email;
///
/// let email = Email::parse(" Ann@Example.com ").unwrap();
/// assert_eq!(email.as_str(), "Ann@Example.com");
/// assert_eq!(email.key(), "ann@example.com");
/// assert!(Email::parse("ann@").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// # Errors
    ///
    /// Returns [`EmailError`] describing the first problem found.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        match trimmed.split_once('@') {
            Some((local, domain))
                if !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !trimmed.contains(char::is_whitespace) =>
            {
                Ok(Self(trimmed.to_owned()))
            }
            _ => Err(EmailError::Malformed),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form used to key memberships.
    #[must_use]
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }

    /// Whether `other` names the same mailbox, ignoring ASCII case.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_registration_addresses() {
        for input in ["a@b.com", "user.name+forum@example.co.uk", "a@b"] {
            assert!(Email::parse(input).is_ok(), "{input}");
        }
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        for input in ["no-at-symbol", "@domain.com", "user@", "a@b@c", "a b@c.com"] {
            assert_eq!(Email::parse(input), Err(EmailError::Malformed), "{input}");
        }
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(Email::parse(&long), Err(EmailError::TooLong { .. })));
    }

    #[test]
    fn test_key_is_lowercase_but_display_is_not() {
        let email: Email = "Mixed.Case@Example.COM".parse().unwrap();
        assert_eq!(email.key(), "mixed.case@example.com");
        assert_eq!(email.to_string(), "Mixed.Case@Example.COM");
        assert!(email.matches(" mixed.case@example.com"));
        assert!(!email.matches("other@example.com"));
    }
}
