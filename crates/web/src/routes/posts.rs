//! Post route handlers: create, edit, delete, list own posts, vote.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;
use vibehive_core::quota::QuotaDecision;
use vibehive_core::{PostId, PostTag, VoteType};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{OptionalUser, RequireUser};
use crate::notice::Notice;
use crate::services::FieldErrors;
use crate::services::forum::{self, ForumError, PostDraft};
use crate::state::AppState;
use crate::views::{PageContext, PostCard, is_htmx, safe_return_path};

// =============================================================================
// Form Types
// =============================================================================

/// Add/edit post form data.
#[derive(Debug, Default, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tag: String,
}

impl From<PostForm> for PostDraft {
    fn from(form: PostForm) -> Self {
        Self {
            title: form.title,
            description: form.description,
            tag: form.tag,
        }
    }
}

/// Vote form data.
#[derive(Debug, Deserialize)]
pub struct VoteForm {
    pub vote_type: String,
    /// Page to return to for non-HTMX submissions.
    pub return_to: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Tag option for the post form select.
#[derive(Clone)]
pub struct TagOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn tag_options(selected: &str) -> Vec<TagOption> {
    PostTag::ALL
        .iter()
        .map(|tag| TagOption {
            value: tag.as_str(),
            label: tag.label(),
            selected: tag.as_str().eq_ignore_ascii_case(selected.trim()),
        })
        .collect()
}

/// Add/edit post page template.
#[derive(Template, WebTemplate)]
#[template(path = "posts/form.html")]
pub struct PostFormTemplate {
    pub ctx: PageContext,
    pub heading: &'static str,
    pub action: String,
    pub submit_label: &'static str,
    pub title: String,
    pub description: String,
    pub tags: Vec<TagOption>,
    pub errors: FieldErrors,
    /// Posts left today, shown for limited members.
    pub remaining: Option<usize>,
}

impl PostFormTemplate {
    fn new_post(ctx: PageContext, draft: &PostDraft, errors: FieldErrors, quota: QuotaDecision) -> Self {
        Self {
            ctx,
            heading: "Add a Post",
            action: "/add-post".to_string(),
            submit_label: "Publish",
            title: draft.title.clone(),
            description: draft.description.clone(),
            tags: tag_options(&draft.tag),
            errors,
            remaining: match quota {
                QuotaDecision::Allowed { remaining, .. } => Some(remaining),
                QuotaDecision::Unlimited | QuotaDecision::Exhausted { .. } => None,
            },
        }
    }

    fn edit_post(ctx: PageContext, id: &PostId, draft: &PostDraft, errors: FieldErrors) -> Self {
        Self {
            ctx,
            heading: "Edit Post",
            action: format!("/edit-post/{}", urlencoding::encode(id.as_str())),
            submit_label: "Save changes",
            title: draft.title.clone(),
            description: draft.description.clone(),
            tags: tag_options(&draft.tag),
            errors,
            remaining: None,
        }
    }
}

/// My posts page template.
#[derive(Template, WebTemplate)]
#[template(path = "posts/my_posts.html")]
pub struct MyPostsTemplate {
    pub ctx: PageContext,
    pub posts: Vec<PostCard>,
    pub load_error: bool,
}

/// Post card fragment, returned to HTMX vote requests.
#[derive(Template, WebTemplate)]
#[template(path = "partials/post_card.html")]
pub struct PostCardTemplate {
    pub post: PostCard,
    pub return_to: String,
}

const LIMIT_REDIRECT: &str = "/membership";

// =============================================================================
// Create
// =============================================================================

/// Display the add-post form, unless today's limit is used up.
#[instrument(skip(state, ctx, user))]
pub async fn new_post(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireUser(user): RequireUser,
) -> Response {
    let quota = forum::check_post_quota(state.api(), &user).await;
    if quota.is_exhausted() {
        return Redirect::to(&Notice::PostLimit.append_to(LIMIT_REDIRECT)).into_response();
    }

    PostFormTemplate::new_post(ctx, &PostDraft::default(), FieldErrors::new(), quota).into_response()
}

/// Handle the add-post form.
#[instrument(skip(state, ctx, user, form))]
pub async fn create(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireUser(user): RequireUser,
    Form(form): Form<PostForm>,
) -> Response {
    let draft = PostDraft::from(form);
    match forum::create_post(state.api(), &user, &draft).await {
        Ok(()) => Redirect::to(&Notice::PostAdded.append_to("/my-posts")).into_response(),
        Err(ForumError::Invalid(errors)) => {
            let quota = forum::check_post_quota(state.api(), &user).await;
            PostFormTemplate::new_post(ctx, &draft, errors, quota).into_response()
        }
        Err(ForumError::QuotaExhausted) => {
            Redirect::to(&Notice::PostLimit.append_to(LIMIT_REDIRECT)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to add post");
            Redirect::to(&Notice::PostAddFailed.append_to("/add-post")).into_response()
        }
    }
}

// =============================================================================
// Edit
// =============================================================================

/// Display the edit form for one of the user's posts.
#[instrument(skip(state, ctx, user))]
pub async fn edit(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Response {
    let id = PostId::new(id);
    match forum::load_own_post(state.api(), &user, &id).await {
        Ok(post) => {
            PostFormTemplate::edit_post(ctx, &id, &PostDraft::from_post(&post), FieldErrors::new())
                .into_response()
        }
        Err(ForumError::NotAuthor) => {
            Redirect::to(&Notice::NotPostAuthor.append_to("/my-posts")).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load post for editing");
            Redirect::to(&Notice::PostLoadFailed.append_to("/my-posts")).into_response()
        }
    }
}

/// Handle the edit form.
#[instrument(skip(state, ctx, user, form))]
pub async fn update(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    Form(form): Form<PostForm>,
) -> Response {
    let id = PostId::new(id);
    let draft = PostDraft::from(form);
    match forum::update_post(state.api(), &user, &id, &draft).await {
        Ok(()) => Redirect::to(&Notice::PostUpdated.append_to("/my-posts")).into_response(),
        Err(ForumError::Invalid(errors)) => {
            PostFormTemplate::edit_post(ctx, &id, &draft, errors).into_response()
        }
        Err(ForumError::NotAuthor) => {
            Redirect::to(&Notice::NotPostAuthor.append_to("/my-posts")).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to update post");
            Redirect::to(&Notice::PostUpdateFailed.append_to("/my-posts")).into_response()
        }
    }
}

// =============================================================================
// Own posts
// =============================================================================

/// List the user's posts.
#[instrument(skip(state, ctx, user))]
pub async fn my_posts(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireUser(user): RequireUser,
) -> impl IntoResponse {
    let (posts, load_error) = match state.api().list_posts_by_author(&user.email).await {
        Ok(mut posts) => {
            posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            (posts.iter().map(|post| PostCard::new(post, 0)).collect(), false)
        }
        Err(e) if e.is_not_found() => (Vec::new(), false),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load own posts");
            (Vec::new(), true)
        }
    };

    MyPostsTemplate {
        ctx,
        posts,
        load_error,
    }
}

/// Delete one of the user's posts.
#[instrument(skip(state, user))]
pub async fn delete(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let notice = match forum::delete_post(state.api(), &user, &PostId::new(id)).await {
        Ok(()) => Notice::PostDeleted,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to delete post");
            Notice::PostDeleteFailed
        }
    };
    Redirect::to(&notice.append_to("/my-posts"))
}

// =============================================================================
// Voting
// =============================================================================

/// Vote on a post.
///
/// HTMX requests get the re-rendered post card built from the post the API
/// returned; plain form posts are redirected back with a notice.
#[instrument(skip(state, user, headers, form))]
pub async fn vote(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<VoteForm>,
) -> Result<Response> {
    let vote_type: VoteType = form
        .vote_type
        .parse()
        .map_err(AppError::BadRequest)?;
    let return_to = safe_return_path(form.return_to.as_deref());
    let htmx = is_htmx(&headers);
    let id = PostId::new(id);

    match forum::cast_vote(state.api(), user.as_ref(), &id, vote_type).await {
        Ok(post) if htmx => {
            let comment_count = state
                .api()
                .list_comments(&post.id)
                .await
                .map_or(0, |comments| comments.len());
            Ok(PostCardTemplate {
                post: PostCard::new(&post, comment_count),
                return_to,
            }
            .into_response())
        }
        Ok(_) => {
            let notice = match vote_type {
                VoteType::Up => Notice::Upvoted,
                VoteType::Down => Notice::Downvoted,
            };
            Ok(Redirect::to(&notice.append_to(&return_to)).into_response())
        }
        Err(e) => {
            let notice = match e {
                ForumError::LoginRequired => Notice::VoteLoginRequired,
                other => {
                    tracing::warn!(error = %other, "Vote failed");
                    Notice::VoteFailed
                }
            };
            let target = notice.append_to(&return_to);
            if htmx {
                // Counters stay as rendered; the page reloads with the notice
                Ok((StatusCode::OK, [("HX-Redirect", target)]).into_response())
            } else {
                Ok(Redirect::to(&target).into_response())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_options_select_case_insensitively() {
        let options = tag_options("Design");
        let selected: Vec<_> = options.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected.first().map(|o| o.value), Some("design"));
        assert!(tag_options("").iter().all(|o| !o.selected));
    }

    #[test]
    fn test_remaining_shown_only_when_limited() {
        let template = PostFormTemplate::new_post(
            PageContext::default(),
            &PostDraft::default(),
            FieldErrors::new(),
            QuotaDecision::Allowed {
                used: 2,
                remaining: 3,
            },
        );
        assert_eq!(template.remaining, Some(3));

        let template = PostFormTemplate::new_post(
            PageContext::default(),
            &PostDraft::default(),
            FieldErrors::new(),
            QuotaDecision::Unlimited,
        );
        assert_eq!(template.remaining, None);
    }
}
