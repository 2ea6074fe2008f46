//! Public user profile.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;
use vibehive_core::session::default_display_name;

use crate::error::{AppError, Result};
use crate::filters;
use crate::notice::Notice;
use crate::services::membership;
use crate::state::AppState;
use crate::views::{PageContext, PostCard, format_date};

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/profile.html")]
pub struct ProfileTemplate {
    pub ctx: PageContext,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub is_admin: bool,
    pub joined: String,
    /// Display name of an active plan.
    pub badge: Option<&'static str>,
    pub posts: Vec<PostCard>,
    pub is_own: bool,
}

/// Display a user's profile and recent posts.
///
/// A missing user is a 404. When the user record cannot be fetched at all,
/// the page still renders from the address and whatever else loaded, with a
/// notice in place of the details.
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    mut ctx: PageContext,
    Path(email): Path<String>,
) -> Result<Response> {
    let (user, posts, membership) = futures::join!(
        state.api().get_user(&email),
        state.api().list_posts_by_author(&email),
        membership::current_membership(state.api(), &email),
    );

    let user = match user {
        Ok(Some(user)) => Some(user),
        Ok(None) => return Err(AppError::NotFound(format!("user {email}"))),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load profile user");
            ctx.notice = Some(Notice::ProfileUnavailable);
            None
        }
    };

    let mut posts = posts.unwrap_or_else(|e| {
        if !e.is_not_found() {
            tracing::warn!(error = %e, "Failed to load profile posts");
        }
        Vec::new()
    });
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let email = user.as_ref().map_or(email, |user| user.email.clone());
    let is_own = ctx
        .user
        .as_ref()
        .is_some_and(|current| current.email.eq_ignore_ascii_case(&email));
    let name = user
        .as_ref()
        .map(|user| user.name.trim())
        .filter(|name| !name.is_empty())
        .map_or_else(|| default_display_name(&email), str::to_string);

    Ok(ProfileTemplate {
        ctx,
        name,
        photo: user
            .as_ref()
            .and_then(|user| user.photo.clone())
            .unwrap_or_default(),
        is_admin: user.as_ref().is_some_and(|user| user.role.is_admin()),
        joined: user
            .as_ref()
            .map(|user| format_date(user.created_at))
            .unwrap_or_default(),
        badge: membership
            .as_ref()
            .or(user.as_ref().and_then(|user| user.membership.as_ref()))
            .filter(|m| m.is_active)
            .map(|m| m.plan.display_name()),
        posts: posts.iter().map(|post| PostCard::new(post, 0)).collect(),
        is_own,
        email,
    }
    .into_response())
}
