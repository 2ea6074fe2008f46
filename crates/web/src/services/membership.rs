//! Membership plans and purchase.
//!
//! There is no payment step: choosing a plan records an active membership
//! with the forum API and reads it back to confirm.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;
use vibehive_core::models::{Membership, NewMembership};
use vibehive_core::session::CurrentUser;
use vibehive_core::{BillingPeriod, Email, EmailError, MembershipPlan};

use crate::api::{ApiClient, ApiError};
use crate::error::add_breadcrumb;

/// Errors from membership purchase.
#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("membership dates out of range")]
    InvalidPeriod,

    /// The membership was posted but does not read back.
    #[error("membership was not recorded")]
    NotConfirmed,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Features listed on each plan card.
#[must_use]
pub const fn plan_features(plan: MembershipPlan) -> &'static [&'static str] {
    match plan {
        MembershipPlan::Basic => &[
            "Up to 5 posts per day",
            "Direct messaging",
            "Basic profile customization",
            "Email support",
            "Access to general discussions",
        ],
        MembershipPlan::Premium => &[
            "Unlimited forum posts",
            "Everything in Explorer",
            "Priority support",
            "Advanced profile themes",
            "Exclusive content access",
        ],
    }
}

/// Build the membership record for a purchase made at `now`.
///
/// # Errors
///
/// [`MembershipError::InvalidPeriod`] when the expiry overflows.
pub fn new_membership(
    email: &Email,
    plan: MembershipPlan,
    period: BillingPeriod,
    now: DateTime<Utc>,
) -> Result<NewMembership, MembershipError> {
    let expire_date = period
        .expiry_from(now)
        .ok_or(MembershipError::InvalidPeriod)?;
    Ok(NewMembership {
        email: email.key(),
        plan,
        start_date: now,
        expire_date,
        is_active: true,
    })
}

/// Record a membership for `user` and confirm it.
///
/// # Errors
///
/// Returns the API error, or [`MembershipError::NotConfirmed`] when the new
/// membership cannot be read back.
#[instrument(skip(api, user), fields(email = %user.email))]
pub async fn subscribe(
    api: &ApiClient,
    user: &CurrentUser,
    plan: MembershipPlan,
    period: BillingPeriod,
) -> Result<Membership, MembershipError> {
    let email = Email::parse(&user.email)?;
    let record = new_membership(&email, plan, period, Utc::now())?;

    api.create_membership(&record).await?;
    let membership = api
        .get_membership(&record.email)
        .await?
        .ok_or(MembershipError::NotConfirmed)?;

    add_breadcrumb("membership", "Subscribed", Some(&[("plan", plan.as_str())]));
    tracing::info!(plan = %plan, period = period.as_str(), "Membership activated");
    Ok(membership)
}

/// Current membership, `None` when absent or unreadable.
pub async fn current_membership(api: &ApiClient, email: &str) -> Option<Membership> {
    match api.get_membership(&email.to_lowercase()).await {
        Ok(membership) => membership,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read membership");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_new_membership_lowercases_and_dates() {
        let email = Email::parse("Ann@Example.com").unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();

        let monthly =
            new_membership(&email, MembershipPlan::Basic, BillingPeriod::Monthly, now).unwrap();
        assert_eq!(monthly.email, "ann@example.com");
        assert!(monthly.is_active);
        assert_eq!(
            monthly.expire_date,
            Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap()
        );

        let annual =
            new_membership(&email, MembershipPlan::Premium, BillingPeriod::Annual, now).unwrap();
        assert_eq!(
            annual.expire_date,
            Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_only_premium_advertises_unlimited_posts() {
        assert!(plan_features(MembershipPlan::Premium).contains(&"Unlimited forum posts"));
        assert!(!plan_features(MembershipPlan::Basic).contains(&"Unlimited forum posts"));
    }
}
