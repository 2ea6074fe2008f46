//! Access decisions for private and admin-only pages.
//!
//! These functions decide; they never fetch. The web crate's extractors feed
//! them session data and, for admins, the result of the remote admin check.

use crate::session::{AdminProfile, CurrentUser};

/// Outcome of a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Authorized,
    Unauthorized,
}

/// Gate for pages that need any signed-in user.
#[must_use]
pub fn private_route(user: Option<&CurrentUser>) -> Access {
    match user {
        Some(user) if !user.email.is_empty() => Access::Authorized,
        _ => Access::Unauthorized,
    }
}

/// Local part of the admin gate, evaluated before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminPrecheck {
    Granted,
    Denied,
    /// Local data is inconclusive; ask the API about this email.
    VerifyRemotely(String),
}

/// Evaluate the admin gate from session data alone.
///
/// Order: resolved role, then presence of a stored admin email, then the
/// cached profile's role.
#[must_use]
pub fn admin_precheck(
    user: Option<&CurrentUser>,
    admin_email: Option<&str>,
    admin_profile: Option<&str>,
) -> AdminPrecheck {
    if user.is_some_and(CurrentUser::is_admin) {
        return AdminPrecheck::Granted;
    }

    let Some(email) = admin_email.filter(|email| !email.is_empty()) else {
        return AdminPrecheck::Denied;
    };

    let cached_admin = admin_profile
        .and_then(AdminProfile::parse)
        .and_then(|profile| profile.role)
        .is_some_and(crate::types::Role::is_admin);
    if cached_admin {
        return AdminPrecheck::Granted;
    }

    AdminPrecheck::VerifyRemotely(email.to_owned())
}

/// Result of `GET /admin/check/:email`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAdminCheck {
    Confirmed,
    Rejected,
    /// Transport failure or non-success status.
    Unavailable,
}

/// Why the admin gate refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminDenial {
    /// The API says this email is not an admin; the marker must be cleared.
    Rejected,
    /// The API could not be asked and the fallback list does not match.
    VerificationFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminDecision {
    Granted,
    Denied(AdminDenial),
}

/// Emails accepted as admins when the API cannot be reached.
///
/// Empty by default, which makes the gate fail closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList {
    emails: Vec<String>,
}

impl AdminAllowList {
    #[must_use]
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|email| email.as_ref().trim().to_lowercase())
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated list.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    #[must_use]
    pub fn contains(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.emails.iter().any(|allowed| *allowed == email)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

/// Finish the admin gate once the remote check has answered.
#[must_use]
pub fn admin_remote_outcome(
    email: &str,
    check: RemoteAdminCheck,
    fallback: &AdminAllowList,
) -> AdminDecision {
    match check {
        RemoteAdminCheck::Confirmed => AdminDecision::Granted,
        RemoteAdminCheck::Rejected => AdminDecision::Denied(AdminDenial::Rejected),
        RemoteAdminCheck::Unavailable if fallback.contains(email) => AdminDecision::Granted,
        RemoteAdminCheck::Unavailable => AdminDecision::Denied(AdminDenial::VerificationFailed),
    }
}
