//! Daily post limit.
//!
//! Members without an active premium plan may publish a limited number of
//! posts per local calendar day. This is a front-end courtesy check; the API
//! does not enforce it.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};

use crate::models::{Membership, Post};

/// Posts per day allowed without an active premium membership.
pub const DAILY_POST_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// Active premium membership.
    Unlimited,
    Allowed { used: usize, remaining: usize },
    Exhausted { used: usize },
}

impl QuotaDecision {
    #[must_use]
    pub const fn is_exhausted(self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Start of the calendar day containing `now`, in `now`'s time zone.
///
/// When local midnight does not exist (a DST gap), the earliest valid instant
/// of the day is approximated by subtracting the wall-clock time elapsed.
#[must_use]
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map_or_else(
            || now.clone() - now.time().signed_duration_since(NaiveTime::MIN),
            |start| start,
        )
        .with_timezone(&Utc)
}

/// Decide whether `author_email` may publish another post today.
///
/// `posts` may contain other authors' posts; only the author's are counted.
#[must_use]
pub fn check_daily_quota<Tz: TimeZone>(
    membership: Option<&Membership>,
    posts: &[Post],
    author_email: &str,
    now: &DateTime<Tz>,
) -> QuotaDecision {
    if membership.is_some_and(Membership::is_active_premium) {
        return QuotaDecision::Unlimited;
    }

    let since = start_of_day(now);
    let used = posts
        .iter()
        .filter(|post| post.is_authored_by(author_email))
        .filter(|post| post.created_at.is_some_and(|created| created >= since))
        .count();

    if used >= DAILY_POST_LIMIT {
        QuotaDecision::Exhausted { used }
    } else {
        QuotaDecision::Allowed {
            used,
            remaining: DAILY_POST_LIMIT - used,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, FixedOffset};

    use super::*;
    use crate::types::{MembershipPlan, PostId};

    fn post_at(author: &str, created_at: DateTime<Utc>) -> Post {
        Post {
            id: PostId::new(format!("{author}-{}", created_at.timestamp())),
            title: "t".to_owned(),
            description: "d".to_owned(),
            author_name: author.to_owned(),
            author_email: author.to_owned(),
            author_image: None,
            tag: "other".to_owned(),
            up_vote: 0,
            down_vote: 0,
            created_at: Some(created_at),
        }
    }

    fn membership(plan: MembershipPlan, is_active: bool) -> Membership {
        Membership {
            email: Some("a@b.com".to_owned()),
            plan,
            is_active,
            start_date: None,
            expire_date: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 14, 15, 0, 0).unwrap()
    }

    fn five_today() -> Vec<Post> {
        (1..=5)
            .map(|hour| post_at("a@b.com", now() - Duration::hours(hour)))
            .collect()
    }

    #[test]
    fn test_basic_plan_with_five_posts_is_exhausted() {
        let basic = membership(MembershipPlan::Basic, true);
        let decision = check_daily_quota(Some(&basic), &five_today(), "a@b.com", &now());
        assert_eq!(decision, QuotaDecision::Exhausted { used: 5 });
    }

    #[test]
    fn test_no_membership_with_five_posts_is_exhausted() {
        let decision = check_daily_quota(None, &five_today(), "a@b.com", &now());
        assert!(decision.is_exhausted());
    }

    #[test]
    fn test_active_premium_is_never_limited() {
        let premium = membership(MembershipPlan::Premium, true);
        let decision = check_daily_quota(Some(&premium), &five_today(), "a@b.com", &now());
        assert_eq!(decision, QuotaDecision::Unlimited);
    }

    #[test]
    fn test_inactive_premium_is_limited() {
        let lapsed = membership(MembershipPlan::Premium, false);
        let decision = check_daily_quota(Some(&lapsed), &five_today(), "a@b.com", &now());
        assert!(decision.is_exhausted());
    }

    #[test]
    fn test_yesterdays_and_other_authors_posts_do_not_count() {
        let mut posts = five_today();
        posts.truncate(2);
        posts.push(post_at("a@b.com", now() - Duration::days(1)));
        posts.push(post_at("someone@else.com", now()));
        let decision = check_daily_quota(None, &posts, "a@b.com", &now());
        assert_eq!(decision, QuotaDecision::Allowed { used: 2, remaining: 3 });
    }

    #[test]
    fn test_day_boundary_follows_local_time_zone() {
        // 01:00 local at UTC+3 is 22:00 UTC the previous day.
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let local_now = tz.with_ymd_and_hms(2025, 7, 14, 1, 0, 0).unwrap();
        let before_local_midnight = Utc.with_ymd_and_hms(2025, 7, 13, 20, 59, 0).unwrap();
        let after_local_midnight = Utc.with_ymd_and_hms(2025, 7, 13, 21, 1, 0).unwrap();
        let posts = vec![
            post_at("a@b.com", before_local_midnight),
            post_at("a@b.com", after_local_midnight),
        ];
        let decision = check_daily_quota(None, &posts, "a@b.com", &local_now);
        assert_eq!(decision, QuotaDecision::Allowed { used: 1, remaining: 4 });
    }
}
