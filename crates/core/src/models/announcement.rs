use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AnnouncementId, TagId};

/// A site-wide announcement posted by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    #[serde(rename = "_id")]
    pub id: AnnouncementId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    #[serde(default)]
    pub author_image: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /announcements`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnouncement {
    pub title: String,
    pub description: String,
    pub author_name: String,
    pub author_email: String,
    pub author_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Admin-managed filter chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    #[serde(rename = "_id")]
    pub id: TagId,
    #[serde(default)]
    pub name: String,
}

/// Body of `POST /tags`.
#[derive(Debug, Clone, Serialize)]
pub struct NewTag {
    pub name: String,
}

/// Aggregate counters from `GET /forum-stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForumStats {
    pub total_posts: u64,
    pub total_comments: u64,
    pub total_users: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forum_stats_missing_fields_default_to_zero() {
        let stats: ForumStats = serde_json::from_str(r#"{"totalPosts":12}"#).unwrap();
        assert_eq!(stats.total_posts, 12);
        assert_eq!(stats.total_comments, 0);
        assert_eq!(stats.total_users, 0);
    }
}
