//! Comments page, new comments and reports.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;
use vibehive_core::models::ReportFeedback;
use vibehive_core::{CommentId, PostId};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalUser;
use crate::notice::Notice;
use crate::services::forum::{self, ForumError};
use crate::state::AppState;
use crate::views::{CommentView, PageContext, PostCard};

/// New comment form data.
#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub comment: String,
}

/// Report form data.
#[derive(Debug, Deserialize)]
pub struct ReportForm {
    pub post_id: String,
    pub feedback: Option<String>,
}

/// Report reason option.
#[derive(Clone)]
pub struct FeedbackOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// Comments page template.
#[derive(Template, WebTemplate)]
#[template(path = "posts/comments.html")]
pub struct CommentsTemplate {
    pub ctx: PageContext,
    pub post: PostCard,
    pub comments: Vec<CommentView>,
    pub feedback_options: Vec<FeedbackOption>,
    pub load_error: bool,
}

fn comments_path(post_id: &PostId) -> String {
    format!("/posts/{}/comments", urlencoding::encode(post_id.as_str()))
}

/// Display a post with its comments.
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(post_id): Path<String>,
) -> Result<Response> {
    let post_id = PostId::new(post_id);
    let (post, comments) = futures::join!(
        state.api().get_post(&post_id),
        state.api().list_comments(&post_id),
    );

    let post = match post {
        Ok(post) => post,
        Err(e) if e.is_not_found() => {
            return Err(AppError::NotFound(format!("post {post_id}")));
        }
        Err(e) => return Err(e.into()),
    };

    let (comments, load_error) = match comments {
        Ok(comments) => (comments, false),
        Err(e) if e.is_not_found() => (Vec::new(), false),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load comments");
            (Vec::new(), true)
        }
    };

    Ok(CommentsTemplate {
        ctx,
        post: PostCard::new(&post, comments.len()),
        comments: comments.iter().map(CommentView::new).collect(),
        feedback_options: ReportFeedback::ALL
            .iter()
            .map(|feedback| FeedbackOption {
                value: feedback.as_str(),
                label: feedback.message(),
            })
            .collect(),
        load_error,
    }
    .into_response())
}

/// Add a comment to a post.
#[instrument(skip(state, user, form))]
pub async fn create(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Path(post_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> impl IntoResponse {
    let post_id = PostId::new(post_id);
    let notice = match forum::add_comment(state.api(), user.as_ref(), &post_id, &form.comment).await
    {
        Ok(()) => Notice::CommentPosted,
        Err(ForumError::LoginRequired) => Notice::CommentLoginRequired,
        Err(ForumError::EmptyComment) => Notice::CommentEmpty,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to post comment");
            Notice::CommentFailed
        }
    };
    Redirect::to(&notice.append_to(&comments_path(&post_id)))
}

/// Report a comment.
#[instrument(skip(state, user, form))]
pub async fn report(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Path(comment_id): Path<String>,
    Form(form): Form<ReportForm>,
) -> impl IntoResponse {
    let comment_id = CommentId::new(comment_id);
    let post_id = PostId::new(form.post_id);
    let notice = match forum::report_comment(
        state.api(),
        user.as_ref(),
        &comment_id,
        &post_id,
        form.feedback.as_deref(),
    )
    .await
    {
        Ok(_) => Notice::CommentReported,
        Err(ForumError::LoginRequired) => Notice::LoginRequired,
        Err(ForumError::MissingFeedback) => Notice::ReportFeedbackRequired,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to report comment");
            Notice::ReportFailed
        }
    };
    Redirect::to(&notice.append_to(&comments_path(&post_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_path_encodes_id() {
        assert_eq!(comments_path(&PostId::new("abc")), "/posts/abc/comments");
        assert_eq!(comments_path(&PostId::new("a/b")), "/posts/a%2Fb/comments");
    }
}
