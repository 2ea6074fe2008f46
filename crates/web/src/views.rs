//! Data shared by every rendered page, and small view models.

use axum::extract::{FromRequestParts, Query};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use std::convert::Infallible;
use vibehive_core::models::{Comment, Post, PostWithStats};
use vibehive_core::session::CurrentUser;

use crate::notice::{Notice, NoticeKind, NoticeQuery};
use crate::session::SessionStore;
use crate::state::AppState;

/// Navigation and banner data for the base layout.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    /// Announcements published since the visitor last looked.
    pub unread: usize,
    pub notice: Option<Notice>,
    /// Path and query of the current page, for "back here" links.
    pub path: String,
}

impl PageContext {
    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_admin)
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        self.user.as_ref().map_or("", |user| user.name.as_str())
    }

    #[must_use]
    pub fn user_email(&self) -> &str {
        self.user.as_ref().map_or("", |user| user.email.as_str())
    }

    #[must_use]
    pub fn user_photo(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|user| user.photo.as_deref())
            .unwrap_or("")
    }

    /// CSS modifier for the notice banner.
    #[must_use]
    pub fn notice_class(&self) -> &'static str {
        match self.notice.map(Notice::kind) {
            Some(NoticeKind::Success) => "notice--success",
            Some(NoticeKind::Error) => "notice--error",
            Some(NoticeKind::Info) | None => "notice--info",
        }
    }

    #[must_use]
    pub fn notice_message(&self) -> &'static str {
        self.notice.map_or("", Notice::message)
    }

    /// Login link that returns here afterwards.
    #[must_use]
    pub fn login_href(&self) -> String {
        format!("/login?redirect={}", urlencoding::encode(&self.path))
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let notice = Query::<NoticeQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.notice());
        let path = parts
            .uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str())
            .to_string();

        let Ok(store) = SessionStore::from_request_parts(parts, state).await else {
            return Ok(Self {
                notice,
                path,
                ..Self::default()
            });
        };

        let user = store.current_user().await;
        let unread = if user.is_some() {
            let since = match store.last_checked_announcements().await {
                Some(since) => since,
                None => {
                    // First visit: only announcements from now on are unread
                    let now = Utc::now();
                    if let Err(e) = store.mark_announcements_checked(now).await {
                        tracing::warn!(error = %e, "Failed to initialise notification checkpoint");
                    }
                    now
                }
            };
            state.notifications().unread_count(Some(since)).await
        } else {
            0
        };

        Ok(Self {
            user,
            unread,
            notice,
            path,
        })
    }
}

/// A post as shown in listings and on its own page.
#[derive(Debug, Clone)]
pub struct PostCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub author_name: String,
    pub author_email: String,
    pub author_image: String,
    /// Display label; unknown tags are shown verbatim.
    pub tag: String,
    pub up_vote: i64,
    pub down_vote: i64,
    pub comment_count: usize,
    pub created: String,
}

impl PostCard {
    #[must_use]
    pub fn new(post: &Post, comment_count: usize) -> Self {
        Self {
            id: post.id.to_string(),
            title: post.title.clone(),
            description: post.description.clone(),
            author_name: post.author_name.clone(),
            author_email: post.author_email.clone(),
            author_image: post.author_image.clone().unwrap_or_default(),
            tag: post
                .known_tag()
                .map_or_else(|| post.tag.clone(), |tag| tag.label().to_string()),
            up_vote: post.up_vote,
            down_vote: post.down_vote,
            comment_count,
            created: format_date(post.created_at),
        }
    }

    #[must_use]
    pub fn from_listing(listing: &[PostWithStats]) -> Vec<Self> {
        listing
            .iter()
            .map(|item| Self::new(&item.post, item.comment_count))
            .collect()
    }

    #[must_use]
    pub fn comments_label(&self) -> String {
        match self.comment_count {
            1 => "1 comment".to_string(),
            n => format!("{n} comments"),
        }
    }
}

/// A comment as shown on the comments page.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub id: String,
    pub body: String,
    pub user_name: String,
    pub user_email: String,
    pub created: String,
    pub is_reported: bool,
    pub report_count: usize,
    /// Reasons given by reporters, in order.
    pub reports: Vec<String>,
    /// The post the comment belongs to, when known.
    pub post_id: String,
}

impl CommentView {
    #[must_use]
    pub fn new(comment: &Comment) -> Self {
        Self {
            id: comment.id.to_string(),
            body: comment.comment.clone(),
            user_name: comment.user_name.clone(),
            user_email: comment.user_email.clone(),
            created: format_date(comment.created_at),
            is_reported: comment.is_reported || !comment.reports.is_empty(),
            report_count: comment.reports.len(),
            reports: comment
                .reports
                .iter()
                .map(|report| report.feedback.clone())
                .collect(),
            post_id: comment
                .post_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}

/// `Jul 14, 2025`, or empty when unknown.
#[must_use]
pub fn format_date(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.format("%b %-d, %Y").to_string())
        .unwrap_or_default()
}

/// Local redirect target from untrusted input, `/` otherwise.
///
/// Only site-relative paths are accepted; `//host` and absolute URLs are not.
#[must_use]
pub fn safe_return_path(candidate: Option<&str>) -> String {
    match candidate {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.contains(['\r', '\n']) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Whether the request came from the page script (`HX-Request: true`) and
/// expects a fragment rather than a full page.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == "true")
}
