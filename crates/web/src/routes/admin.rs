//! Admin route handlers.
//!
//! Every handler takes [`RequireAdmin`], so a visitor reaching one of them
//! has been confirmed as an admin locally or by the forum API.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::instrument;
use vibehive_core::models::{ForumStats, TagRecord, User};
use vibehive_core::{TagId, UserId};

use crate::filters;
use crate::middleware::RequireAdmin;
use crate::notice::Notice;
use crate::services::admin::{self, AdminError, AnnouncementDraft, Promotion};
use crate::state::AppState;
use crate::views::{CommentView, PageContext, format_date};

// =============================================================================
// Form Types
// =============================================================================

/// Add tag form data.
#[derive(Debug, Deserialize)]
pub struct TagForm {
    #[serde(default)]
    pub name: String,
}

/// Announcement form data.
#[derive(Debug, Deserialize)]
pub struct AnnouncementForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

// =============================================================================
// View Types
// =============================================================================

/// A row on the manage users page.
#[derive(Clone)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub is_admin: bool,
    pub plan: String,
    pub joined: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            photo: user.photo.clone().unwrap_or_default(),
            is_admin: user.role.is_admin(),
            plan: user
                .membership
                .as_ref()
                .filter(|m| m.is_active)
                .map_or_else(|| "Free".to_string(), |m| m.plan.display_name().to_string()),
            joined: format_date(user.created_at),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Admin profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/profile.html")]
pub struct AdminProfileTemplate {
    pub ctx: PageContext,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub stats: Option<ForumStats>,
    pub tags: Vec<TagRecord>,
}

/// Manage users page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub ctx: PageContext,
    pub users: Vec<UserRow>,
    pub load_error: bool,
}

/// Reported activities page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/reports.html")]
pub struct ReportsTemplate {
    pub ctx: PageContext,
    pub comments: Vec<CommentView>,
    pub load_error: bool,
}

/// Make announcement page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/announcement.html")]
pub struct AnnouncementTemplate {
    pub ctx: PageContext,
}

// =============================================================================
// Profile, stats, tags
// =============================================================================

/// Admin profile with forum statistics and tag management.
#[instrument(skip_all)]
pub async fn profile(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
) -> impl IntoResponse {
    let (stats, tags) = futures::join!(state.api().forum_stats(), state.api().list_tags());

    let stats = stats
        .inspect_err(|e| tracing::warn!(error = %e, "Failed to load forum stats"))
        .ok();
    let tags = tags.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load tags");
        Vec::new()
    });

    AdminProfileTemplate {
        ctx,
        name: admin.name,
        email: admin.email,
        photo: admin.photo.unwrap_or_default(),
        stats,
        tags,
    }
}

/// Add a filter tag.
#[instrument(skip(state, _admin))]
pub async fn add_tag(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Form(form): Form<TagForm>,
) -> impl IntoResponse {
    let notice = match admin::add_tag(state.api(), &form.name).await {
        Ok(()) => Notice::TagAdded,
        Err(AdminError::EmptyTag) => Notice::TagInvalid,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to add tag");
            Notice::TagFailed
        }
    };
    Redirect::to(&notice.append_to("/admin"))
}

/// Delete a filter tag.
#[instrument(skip(state, _admin))]
pub async fn delete_tag(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let notice = match admin::delete_tag(state.api(), &TagId::new(id)).await {
        Ok(()) => Notice::TagDeleted,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to delete tag");
            Notice::TagFailed
        }
    };
    Redirect::to(&notice.append_to("/admin"))
}

// =============================================================================
// Users
// =============================================================================

/// List users.
#[instrument(skip_all)]
pub async fn users(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(_admin): RequireAdmin,
) -> impl IntoResponse {
    let (users, load_error) = match state.api().list_users().await {
        Ok(users) => (users.iter().map(UserRow::from).collect(), false),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load users");
            (Vec::new(), true)
        }
    };

    UsersTemplate {
        ctx,
        users,
        load_error,
    }
}

/// Promote a user to admin.
#[instrument(skip(state, _admin))]
pub async fn promote(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let notice = match admin::promote_user(state.api(), &UserId::new(id)).await {
        Ok(Promotion::Promoted) => Notice::RoleUpdated,
        Ok(Promotion::AlreadyAdmin) => Notice::AlreadyAdmin,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to promote user");
            Notice::RoleUpdateFailed
        }
    };
    Redirect::to(&notice.append_to("/admin/users"))
}

// =============================================================================
// Reports
// =============================================================================

/// Reported comments awaiting review.
#[instrument(skip_all)]
pub async fn reports(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(_admin): RequireAdmin,
) -> impl IntoResponse {
    let (comments, load_error) = match state.api().reported_comments().await {
        Ok(comments) => (comments.iter().map(CommentView::new).collect(), false),
        Err(e) if e.is_not_found() => (Vec::new(), false),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load reported comments");
            (Vec::new(), true)
        }
    };

    ReportsTemplate {
        ctx,
        comments,
        load_error,
    }
}

// =============================================================================
// Announcements
// =============================================================================

/// Display the announcement form.
pub async fn announcement_form(ctx: PageContext, RequireAdmin(_admin): RequireAdmin) -> impl IntoResponse {
    AnnouncementTemplate { ctx }
}

/// Publish an announcement and refresh the shared feed.
#[instrument(skip(state, admin, form))]
pub async fn announce(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Form(form): Form<AnnouncementForm>,
) -> impl IntoResponse {
    let draft = AnnouncementDraft {
        title: form.title,
        description: form.description,
    };

    let notice = match admin::post_announcement(state.api(), &admin, &draft).await {
        Ok(()) => {
            if let Err(e) = state.notifications().refresh().await {
                tracing::warn!(error = %e, "Failed to refresh announcements after posting");
            }
            Notice::AnnouncementPosted
        }
        Err(AdminError::MissingAnnouncementFields) => Notice::AnnouncementFieldsRequired,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to post announcement");
            Notice::AnnouncementFailed
        }
    };
    Redirect::to(&notice.append_to("/admin/announcements"))
}

#[cfg(test)]
mod tests {
    use vibehive_core::models::Membership;
    use vibehive_core::{MembershipPlan, Role};

    use super::*;

    fn user(membership: Option<Membership>) -> User {
        User {
            id: UserId::new("u1"),
            name: "Ann".to_string(),
            email: "a@b.com".to_string(),
            photo: None,
            role: Role::Admin,
            membership,
            created_at: None,
        }
    }

    #[test]
    fn test_user_row_plan_label() {
        assert_eq!(UserRow::from(&user(None)).plan, "Free");

        let premium = Membership {
            email: None,
            plan: MembershipPlan::Premium,
            is_active: true,
            start_date: None,
            expire_date: None,
        };
        let row = UserRow::from(&user(Some(premium.clone())));
        assert_eq!(row.plan, "Forum Master");
        assert!(row.is_admin);

        let lapsed = Membership {
            is_active: false,
            ..premium
        };
        assert_eq!(UserRow::from(&user(Some(lapsed))).plan, "Free");
    }
}
