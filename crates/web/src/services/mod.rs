//! Business flows between the route handlers and the remote services.
//!
//! Services validate input, call the forum API or identity provider and
//! return typed outcomes; turning those into pages, redirects and notices is
//! left to the routes.

pub mod admin;
pub mod auth;
pub mod forum;
pub mod membership;
pub mod notifications;

/// One inline validation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Inline validation messages for a form, in field order.
///
/// Collected before any network call so that nothing is sent for an invalid
/// form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Record `message` when `value` is blank.
    pub fn require(&mut self, field: &'static str, value: &str, message: &str) {
        if value.trim().is_empty() {
            self.push(field, message);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First message for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    /// `Ok(value)` when no errors were recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when any field failed.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.iter().map(|error| error.field).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_blank_values() {
        let mut errors = FieldErrors::new();
        errors.require("title", "  ", "Title is required");
        errors.require("tag", "design", "Tag is required");
        assert_eq!(errors.get("title"), Some("Title is required"));
        assert_eq!(errors.get("tag"), None);
        assert_eq!(errors.to_string(), "invalid fields: title");
        assert!(errors.into_result(()).is_err());
    }

    #[test]
    fn test_empty_errors_pass_value_through() {
        assert_eq!(FieldErrors::new().into_result(7), Ok(7));
    }
}
