//! Enumerations shared between the forum API and the front end.

use serde::{Deserialize, Serialize};

/// Forum role of a user record.
///
/// Records without a role field are ordinary users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Paid membership tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipPlan {
    /// "Forum Explorer". Still subject to the daily post limit.
    Basic,
    /// "Forum Master". Unlimited posting.
    Premium,
}

impl MembershipPlan {
    pub const ALL: [Self; 2] = [Self::Basic, Self::Premium];

    /// Marketing name shown on the membership page.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Basic => "Forum Explorer",
            Self::Premium => "Forum Master",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
        }
    }
}

impl std::fmt::Display for MembershipPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MembershipPlan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            _ => Err(format!("invalid membership plan: {s}")),
        }
    }
}

/// Billing cadence selected on the membership page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    #[default]
    Monthly,
    Annual,
}

impl BillingPeriod {
    /// Expiry of a membership started at `start`.
    ///
    /// Calendar arithmetic: one month or one year later, clamped to the end
    /// of a shorter month. Returns `None` only when the result is out of
    /// chrono's representable range.
    #[must_use]
    pub fn expiry_from<Tz: chrono::TimeZone>(
        self,
        start: chrono::DateTime<Tz>,
    ) -> Option<chrono::DateTime<Tz>> {
        let months = match self {
            Self::Monthly => 1,
            Self::Annual => 12,
        };
        start.checked_add_months(chrono::Months::new(months))
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }
}

/// Direction of a vote on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

impl std::str::FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(format!("invalid vote type: {s}")),
        }
    }
}

/// Topic tag attached to a post.
///
/// The set is closed for writes. Posts read back with a tag outside this set
/// keep the raw string (see [`crate::models::Post::tag`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostTag {
    Technology,
    Programming,
    Design,
    Business,
    Science,
    Health,
    Other,
}

impl PostTag {
    pub const ALL: [Self; 7] = [
        Self::Technology,
        Self::Programming,
        Self::Design,
        Self::Business,
        Self::Science,
        Self::Health,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Technology => "technology",
            Self::Programming => "programming",
            Self::Design => "design",
            Self::Business => "business",
            Self::Science => "science",
            Self::Health => "health",
            Self::Other => "other",
        }
    }

    /// Capitalized label for select boxes and chips.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Technology => "Technology",
            Self::Programming => "Programming",
            Self::Design => "Design",
            Self::Business => "Business",
            Self::Science => "Science",
            Self::Health => "Health",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for PostTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("invalid tag: {s}"))
    }
}
