//! Resolution of the current actor.
//!
//! A visitor's session may hold two independent sources of identity:
//!
//! - the **identity profile** established by signing in with the identity
//!   provider, and
//! - the **admin marker**: an admin email plus a cached admin profile blob
//!   (raw JSON), written when a sign-in is confirmed as an admin.
//!
//! [`resolve_current_user`] combines them into a single [`CurrentUser`]. The
//! admin marker wins when complete and well-formed; otherwise the identity
//! profile is used; otherwise the visitor is anonymous.

use serde::{Deserialize, Serialize};

use crate::models::AdminCheck;
use crate::types::Role;

/// Name shown for an admin whose cached profile has none.
pub const ADMIN_DEFAULT_NAME: &str = "Admin User";

/// Avatar shown for an admin whose cached profile has none.
pub const ADMIN_DEFAULT_PHOTO: &str = "https://i.ibb.co/ZJP3sFZ/admin.png";

/// Principal established with the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
    /// Identity provider user id.
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Forum role, when it was known at sign-in.
    #[serde(default)]
    pub role: Option<Role>,
}

/// Cached admin profile stored next to the admin email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl AdminProfile {
    /// Parse a stored blob. Malformed blobs are treated as absent.
    #[must_use]
    pub fn parse(blob: &str) -> Option<Self> {
        serde_json::from_str(blob).ok()
    }
}

impl From<AdminCheck> for AdminProfile {
    fn from(check: AdminCheck) -> Self {
        Self {
            name: check.name,
            email: check.email,
            photo: check.photo,
            role: Some(check.role.unwrap_or(Role::Admin)),
        }
    }
}

/// Where the resolved actor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorSource {
    AdminMarker,
    Identity,
}

/// The resolved identity and role of the visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// Identity provider user id. Absent for marker-only admins.
    pub uid: Option<String>,
    pub email: String,
    pub name: String,
    pub photo: Option<String>,
    pub role: Role,
    pub source: ActorSource,
}

impl CurrentUser {
    /// An admin actor built from an admin email and its cached profile.
    #[must_use]
    pub fn admin(email: &str, profile: AdminProfile) -> Self {
        Self {
            uid: None,
            email: email.to_owned(),
            name: profile
                .name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| ADMIN_DEFAULT_NAME.to_owned()),
            photo: Some(profile.photo.unwrap_or_else(|| ADMIN_DEFAULT_PHOTO.to_owned())),
            role: Role::Admin,
            source: ActorSource::AdminMarker,
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Raw session values the resolver reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredSession<'a> {
    pub identity: Option<&'a IdentityProfile>,
    pub admin_email: Option<&'a str>,
    pub admin_profile: Option<&'a str>,
}

/// Name to show for an email when no display name is known.
#[must_use]
pub fn default_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_owned()
}

/// Resolve the current actor from stored session values.
#[must_use]
pub fn resolve_current_user(stored: StoredSession<'_>) -> Option<CurrentUser> {
    if let Some(admin) = resolve_admin_marker(stored.admin_email, stored.admin_profile) {
        return Some(admin);
    }

    let identity = stored.identity?;
    if identity.email.is_empty() {
        return None;
    }
    let name = identity
        .display_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| default_display_name(&identity.email));

    Some(CurrentUser {
        uid: Some(identity.uid.clone()),
        email: identity.email.clone(),
        name,
        photo: identity.photo_url.clone(),
        role: identity.role.unwrap_or_default(),
        source: ActorSource::Identity,
    })
}

fn resolve_admin_marker(email: Option<&str>, blob: Option<&str>) -> Option<CurrentUser> {
    let email = email.filter(|email| !email.is_empty())?;
    let profile = AdminProfile::parse(blob?)?;
    Some(CurrentUser::admin(email, profile))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn identity() -> IdentityProfile {
        IdentityProfile {
            uid: "uid-1".to_owned(),
            email: "reader@example.com".to_owned(),
            display_name: None,
            photo_url: None,
            role: None,
        }
    }

    #[test]
    fn test_anonymous_when_nothing_stored() {
        assert!(resolve_current_user(StoredSession::default()).is_none());
    }

    #[test]
    fn test_admin_marker_without_identity_resolves_admin() {
        let user = resolve_current_user(StoredSession {
            identity: None,
            admin_email: Some("boss@example.com"),
            admin_profile: Some(r#"{"role":"admin"}"#),
        })
        .unwrap();
        assert_eq!(user.email, "boss@example.com");
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.name, ADMIN_DEFAULT_NAME);
        assert_eq!(user.photo.as_deref(), Some(ADMIN_DEFAULT_PHOTO));
        assert_eq!(user.source, ActorSource::AdminMarker);
    }

    #[test]
    fn test_admin_marker_wins_over_identity() {
        let identity = identity();
        let user = resolve_current_user(StoredSession {
            identity: Some(&identity),
            admin_email: Some("boss@example.com"),
            admin_profile: Some(r#"{"name":"Boss"}"#),
        })
        .unwrap();
        assert_eq!(user.email, "boss@example.com");
        assert_eq!(user.name, "Boss");
        assert!(user.is_admin());
    }

    #[test]
    fn test_malformed_blob_falls_through_to_identity() {
        let identity = identity();
        let user = resolve_current_user(StoredSession {
            identity: Some(&identity),
            admin_email: Some("boss@example.com"),
            admin_profile: Some("{not json"),
        })
        .unwrap();
        assert_eq!(user.email, "reader@example.com");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.source, ActorSource::Identity);
    }

    #[test]
    fn test_incomplete_marker_is_ignored() {
        let user = resolve_current_user(StoredSession {
            identity: None,
            admin_email: Some("boss@example.com"),
            admin_profile: None,
        });
        assert!(user.is_none());
    }

    #[test]
    fn test_identity_name_defaults_to_local_part() {
        let identity = identity();
        let user = resolve_current_user(StoredSession {
            identity: Some(&identity),
            ..StoredSession::default()
        })
        .unwrap();
        assert_eq!(user.name, "reader");
        assert_eq!(user.uid.as_deref(), Some("uid-1"));
    }

    #[test]
    fn test_identity_role_admin_is_kept() {
        let mut identity = identity();
        identity.role = Some(Role::Admin);
        let user = resolve_current_user(StoredSession {
            identity: Some(&identity),
            ..StoredSession::default()
        })
        .unwrap();
        assert!(user.is_admin());
    }

    #[test]
    fn test_admin_profile_from_check_defaults_role() {
        let profile = AdminProfile::from(AdminCheck {
            is_admin: true,
            name: Some("Boss".to_owned()),
            ..AdminCheck::default()
        });
        assert_eq!(profile.role, Some(Role::Admin));
        assert_eq!(profile.name.as_deref(), Some("Boss"));
    }
}
