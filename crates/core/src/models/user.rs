use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{MembershipPlan, Role, UserId};

/// A forum user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub membership: Option<Membership>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /users`, sent once after the identity account exists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub photo: Option<String>,
    pub email: String,
    /// Identity provider user id.
    pub uid: String,
    pub created_at: DateTime<Utc>,
    /// Federated sign-in provider, e.g. `google`. Absent for passwords.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Paid membership attached to a user (keyed by lowercase email).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    #[serde(default)]
    pub email: Option<String>,
    pub plan: MembershipPlan,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expire_date: Option<DateTime<Utc>>,
}

impl Membership {
    /// Active premium memberships lift the daily post limit.
    ///
    /// The expiry date is informational; the API is responsible for flipping
    /// `isActive` when a membership lapses.
    #[must_use]
    pub fn is_active_premium(&self) -> bool {
        self.is_active && self.plan == MembershipPlan::Premium
    }
}

/// Body of `POST /users/membership`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMembership {
    pub email: String,
    pub plan: MembershipPlan,
    pub start_date: DateTime<Utc>,
    pub expire_date: DateTime<Utc>,
    pub is_active: bool,
}

/// Response of `GET /admin/check/:email`.
///
/// Besides the flag, the API echoes the admin's profile when it has one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCheck {
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_without_role_is_plain_user() {
        let user: User =
            serde_json::from_str(r#"{"_id":"u1","name":"Ann","email":"ann@example.com"}"#)
                .unwrap();
        assert_eq!(user.role, Role::User);
        assert!(user.membership.is_none());
    }

    #[test]
    fn test_membership_premium_requires_active_flag() {
        let mut membership: Membership =
            serde_json::from_str(r#"{"plan":"premium","isActive":true}"#).unwrap();
        assert!(membership.is_active_premium());
        membership.is_active = false;
        assert!(!membership.is_active_premium());
        membership.is_active = true;
        membership.plan = MembershipPlan::Basic;
        assert!(!membership.is_active_premium());
    }

    #[test]
    fn test_new_user_serializes_camel_case() {
        let body = NewUser {
            name: "Ann".to_owned(),
            photo: None,
            email: "ann@example.com".to_owned(),
            uid: "uid-1".to_owned(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            provider: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["uid"], "uid-1");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("provider").is_none());
    }
}
