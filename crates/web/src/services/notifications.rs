//! Announcement feed and unread counts.
//!
//! A single background task polls the forum API for announcements and keeps
//! the latest snapshot in memory. Pages read the snapshot; they never fetch
//! announcements themselves. Each visitor's session remembers when they last
//! looked, and everything newer counts as unread.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use vibehive_core::models::Announcement;

use crate::api::{ApiClient, ApiError};

/// Shared, periodically refreshed list of announcements.
#[derive(Clone)]
pub struct NotificationFeed {
    api: ApiClient,
    snapshot: Arc<RwLock<Vec<Announcement>>>,
}

impl NotificationFeed {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            snapshot: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Fetch announcements and replace the snapshot.
    ///
    /// On failure the previous snapshot is kept.
    ///
    /// # Errors
    ///
    /// Returns the API error so the caller can log it.
    pub async fn refresh(&self) -> Result<usize, ApiError> {
        let mut announcements = self.api.list_announcements().await?;
        announcements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let count = announcements.len();
        *self.snapshot.write().await = announcements;
        Ok(count)
    }

    /// Announcements, newest first.
    pub async fn announcements(&self) -> Vec<Announcement> {
        self.snapshot.read().await.clone()
    }

    /// Announcements published after `since`.
    pub async fn unread_count(&self, since: Option<DateTime<Utc>>) -> usize {
        count_unread(&self.snapshot.read().await, since)
    }

    /// Poll every `interval`, starting immediately.
    ///
    /// The returned handle owns the task; abort it to stop polling.
    #[must_use]
    pub fn spawn_poller(&self, interval: Duration) -> JoinHandle<()> {
        let feed = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match feed.refresh().await {
                    Ok(count) => tracing::debug!(count, "Refreshed announcements"),
                    Err(e) => tracing::warn!(error = %e, "Failed to refresh announcements"),
                }
            }
        })
    }
}

/// Count announcements created strictly after `since`.
///
/// Without a checkpoint nothing is unread; undated announcements never are.
#[must_use]
pub fn count_unread(announcements: &[Announcement], since: Option<DateTime<Utc>>) -> usize {
    let Some(since) = since else {
        return 0;
    };
    announcements
        .iter()
        .filter(|a| a.created_at.is_some_and(|created| created > since))
        .count()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use vibehive_core::AnnouncementId;

    use super::*;

    fn announcement(id: &str, created_at: Option<DateTime<Utc>>) -> Announcement {
        Announcement {
            id: AnnouncementId::new(id),
            title: format!("Announcement {id}"),
            description: String::new(),
            author_name: "Admin".to_owned(),
            author_email: "admin@example.com".to_owned(),
            author_image: None,
            created_at,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 14, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_counts_only_newer_announcements() {
        let feed = vec![
            announcement("a", Some(at(9))),
            announcement("b", Some(at(11))),
            announcement("c", Some(at(12))),
            announcement("d", None),
        ];
        assert_eq!(count_unread(&feed, Some(at(10))), 2);
        assert_eq!(count_unread(&feed, Some(at(11))), 1);
        assert_eq!(count_unread(&feed, Some(at(13))), 0);
    }

    #[test]
    fn test_no_checkpoint_means_nothing_unread() {
        let feed = vec![announcement("a", Some(at(9)))];
        assert_eq!(count_unread(&feed, None), 0);
    }
}
