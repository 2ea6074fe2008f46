//! Announcement notifications.
//!
//! Announcements come from the shared feed kept fresh by the background
//! poller; these handlers only read it and move the visitor's checkpoint.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};
use chrono::Utc;
use vibehive_core::models::Announcement;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireUser;
use crate::notice::Notice;
use crate::session::SessionStore;
use crate::state::AppState;
use crate::views::{PageContext, format_date};

/// An announcement as listed.
#[derive(Clone)]
pub struct AnnouncementView {
    pub title: String,
    pub description: String,
    pub author_name: String,
    pub author_image: String,
    pub created: String,
    pub unread: bool,
}

impl AnnouncementView {
    fn new(announcement: &Announcement, since: Option<chrono::DateTime<Utc>>) -> Self {
        Self {
            title: announcement.title.clone(),
            description: announcement.description.clone(),
            author_name: announcement.author_name.clone(),
            author_image: announcement.author_image.clone().unwrap_or_default(),
            created: format_date(announcement.created_at),
            unread: matches!(
                (announcement.created_at, since),
                (Some(created), Some(since)) if created > since
            ),
        }
    }
}

/// Notifications page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/notifications.html")]
pub struct NotificationsTemplate {
    pub ctx: PageContext,
    pub announcements: Vec<AnnouncementView>,
}

/// Unread badge fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/notification_count.html")]
pub struct NotificationCountTemplate {
    pub count: usize,
}

/// List announcements, newest first, flagging unread ones.
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    store: SessionStore,
    RequireUser(_user): RequireUser,
) -> impl IntoResponse {
    let since = store.last_checked_announcements().await;
    let announcements = state
        .notifications()
        .announcements()
        .await
        .iter()
        .map(|announcement| AnnouncementView::new(announcement, since))
        .collect();

    NotificationsTemplate { ctx, announcements }
}

/// Unread badge, polled by the navigation bar.
pub async fn count(ctx: PageContext) -> impl IntoResponse {
    NotificationCountTemplate { count: ctx.unread }
}

/// Mark every announcement as read.
pub async fn mark_read(
    store: SessionStore,
    RequireUser(_user): RequireUser,
) -> Result<impl IntoResponse> {
    store.mark_announcements_checked(Utc::now()).await?;
    Ok(Redirect::to(&Notice::NotificationsRead.append_to("/notifications")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use vibehive_core::AnnouncementId;

    use super::*;

    #[test]
    fn test_unread_flag_is_strictly_newer() {
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        let announcement = Announcement {
            id: AnnouncementId::new("a1"),
            title: "Maintenance".to_string(),
            description: "Tonight".to_string(),
            author_name: "Admin".to_string(),
            author_email: "admin@example.com".to_string(),
            author_image: None,
            created_at: Some(at),
        };
        assert!(!AnnouncementView::new(&announcement, Some(at)).unread);
        assert!(AnnouncementView::new(&announcement, Some(at - chrono::Duration::seconds(1))).unread);
        assert!(!AnnouncementView::new(&announcement, None).unread);
        assert_eq!(AnnouncementView::new(&announcement, None).created, "May 1, 2025");
    }
}
