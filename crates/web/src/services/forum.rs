//! Posts, votes, comments and reports.
//!
//! Every mutation needs a signed-in user; anonymous attempts fail with
//! [`ForumError::LoginRequired`] before anything is sent. Vote counts are
//! never changed locally: the post returned by the API is what gets shown.

use chrono::{Local, Utc};
use futures::future::join_all;
use thiserror::Error;
use tracing::instrument;
use vibehive_core::models::{
    NewComment, NewPost, Post, PostSort, PostUpdate, PostWithStats, ReportFeedback, ReportRequest,
    VoteRequest, sort_posts,
};
use vibehive_core::quota::{QuotaDecision, check_daily_quota};
use vibehive_core::session::{CurrentUser, default_display_name};
use vibehive_core::{CommentId, PostId, PostTag, VoteType};

use super::FieldErrors;
use crate::api::{ApiClient, ApiError};
use crate::error::add_breadcrumb;

/// Errors from forum mutations.
#[derive(Debug, Error)]
pub enum ForumError {
    #[error("login required")]
    LoginRequired,

    #[error("comment is empty")]
    EmptyComment,

    #[error("report feedback is missing")]
    MissingFeedback,

    #[error("only the author may change this post")]
    NotAuthor,

    #[error("daily post limit reached")]
    QuotaExhausted,

    #[error("{0}")]
    Invalid(FieldErrors),

    #[error(transparent)]
    Api(#[from] ApiError),
}

// =============================================================================
// Votes, comments, reports
// =============================================================================

/// Cast a vote and return the post as the server now sees it.
///
/// # Errors
///
/// [`ForumError::LoginRequired`] for anonymous visitors (no request is sent),
/// otherwise the API error.
#[instrument(skip(api, user), fields(post_id = %post_id))]
pub async fn cast_vote(
    api: &ApiClient,
    user: Option<&CurrentUser>,
    post_id: &PostId,
    vote_type: VoteType,
) -> Result<Post, ForumError> {
    let user = user.ok_or(ForumError::LoginRequired)?;
    let post = api
        .vote(
            post_id,
            &VoteRequest {
                vote_type,
                user_email: user.email.clone(),
            },
        )
        .await?;
    add_breadcrumb("forum", "Voted", Some(&[("post_id", post_id.as_str())]));
    Ok(post)
}

/// Add a comment.
///
/// # Errors
///
/// [`ForumError::LoginRequired`] or [`ForumError::EmptyComment`] without a
/// request, otherwise the API error.
#[instrument(skip(api, user, text), fields(post_id = %post_id))]
pub async fn add_comment(
    api: &ApiClient,
    user: Option<&CurrentUser>,
    post_id: &PostId,
    text: &str,
) -> Result<(), ForumError> {
    let user = user.ok_or(ForumError::LoginRequired)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ForumError::EmptyComment);
    }

    let user_name = if user.name.trim().is_empty() {
        default_display_name(&user.email)
    } else {
        user.name.clone()
    };

    api.add_comment(
        post_id,
        &NewComment {
            comment: text.to_string(),
            user_email: user.email.clone(),
            user_name,
        },
    )
    .await?;
    Ok(())
}

/// Report a comment with one of the fixed feedback reasons.
///
/// `feedback` accepts either the form value or the full sentence.
///
/// # Errors
///
/// [`ForumError::LoginRequired`] or [`ForumError::MissingFeedback`] without a
/// request, otherwise the API error.
#[instrument(skip(api, user), fields(comment_id = %comment_id))]
pub async fn report_comment(
    api: &ApiClient,
    user: Option<&CurrentUser>,
    comment_id: &CommentId,
    post_id: &PostId,
    feedback: Option<&str>,
) -> Result<ReportFeedback, ForumError> {
    user.ok_or(ForumError::LoginRequired)?;
    let feedback = feedback
        .and_then(|value| value.parse::<ReportFeedback>().ok())
        .ok_or(ForumError::MissingFeedback)?;

    api.report_comment(
        comment_id,
        &ReportRequest {
            feedback: feedback.message().to_string(),
            post_id: post_id.clone(),
        },
    )
    .await?;
    Ok(feedback)
}

// =============================================================================
// Post management
// =============================================================================

/// Post form input.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    pub tag: String,
}

impl PostDraft {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(String, String, PostTag), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("title", &self.title, "Title is required");
        errors.require("description", &self.description, "Description is required");

        let tag = if self.tag.trim().is_empty() {
            errors.push("tag", "Please select a tag");
            None
        } else {
            let tag = self.tag.parse::<PostTag>().ok();
            if tag.is_none() {
                errors.push("tag", "Please select a valid tag");
            }
            tag
        };

        match tag {
            Some(tag) => errors.into_result((
                self.title.trim().to_string(),
                self.description.trim().to_string(),
                tag,
            )),
            None => Err(errors),
        }
    }

    #[must_use]
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            description: post.description.clone(),
            tag: post.tag.clone(),
        }
    }
}

/// How many more posts `user` may publish today.
///
/// Read failures degrade: a missing membership counts as no membership and a
/// failed post listing counts as no posts. The API does not enforce the limit
/// either way.
#[instrument(skip(api, user), fields(email = %user.email))]
pub async fn check_post_quota(api: &ApiClient, user: &CurrentUser) -> QuotaDecision {
    let email_lower = user.email.to_lowercase();
    let (membership, posts) = futures::join!(
        api.get_membership(&email_lower),
        api.list_posts_by_author(&user.email),
    );

    let membership = membership.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to read membership for quota");
        None
    });
    let posts = posts.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to read posts for quota");
        Vec::new()
    });

    check_daily_quota(membership.as_ref(), &posts, &user.email, &Local::now())
}

/// Publish a post after validating it and re-checking the daily limit.
///
/// # Errors
///
/// [`ForumError::Invalid`] or [`ForumError::QuotaExhausted`] without a create
/// request, otherwise the API error.
#[instrument(skip(api, user, draft), fields(author = %user.email))]
pub async fn create_post(
    api: &ApiClient,
    user: &CurrentUser,
    draft: &PostDraft,
) -> Result<(), ForumError> {
    let (title, description, tag) = draft.validate().map_err(ForumError::Invalid)?;

    if check_post_quota(api, user).await.is_exhausted() {
        return Err(ForumError::QuotaExhausted);
    }

    api.create_post(&NewPost {
        title,
        description,
        tag,
        author_name: user.name.clone(),
        author_email: user.email.clone(),
        author_image: user.photo.clone(),
        up_vote: 0,
        down_vote: 0,
        created_at: Utc::now(),
    })
    .await?;
    add_breadcrumb("forum", "Created post", None);
    Ok(())
}

/// Fetch a post its author wants to edit.
///
/// # Errors
///
/// [`ForumError::NotAuthor`] when `user` did not write it.
pub async fn load_own_post(
    api: &ApiClient,
    user: &CurrentUser,
    id: &PostId,
) -> Result<Post, ForumError> {
    let post = api.get_post(id).await?;
    if post.is_authored_by(&user.email) {
        Ok(post)
    } else {
        Err(ForumError::NotAuthor)
    }
}

/// Update the editable fields of the user's own post.
///
/// # Errors
///
/// [`ForumError::Invalid`] and [`ForumError::NotAuthor`] are raised before the
/// update request.
#[instrument(skip(api, user, draft), fields(post_id = %id))]
pub async fn update_post(
    api: &ApiClient,
    user: &CurrentUser,
    id: &PostId,
    draft: &PostDraft,
) -> Result<(), ForumError> {
    let (title, description, tag) = draft.validate().map_err(ForumError::Invalid)?;
    load_own_post(api, user, id).await?;
    api.update_post(
        id,
        &PostUpdate {
            title,
            description,
            tag,
        },
    )
    .await?;
    Ok(())
}

/// Delete one of the user's posts. The API scopes deletion to the email.
///
/// # Errors
///
/// Returns the API error.
#[instrument(skip(api, user), fields(post_id = %id))]
pub async fn delete_post(api: &ApiClient, user: &CurrentUser, id: &PostId) -> Result<(), ForumError> {
    api.delete_post(id, &user.email).await?;
    add_breadcrumb("forum", "Deleted post", Some(&[("post_id", id.as_str())]));
    Ok(())
}

// =============================================================================
// Listings
// =============================================================================

/// Home page listing, optionally restricted to one tag.
///
/// # Errors
///
/// Returns the API error when the post list cannot be fetched.
pub async fn load_home(
    api: &ApiClient,
    tag: Option<&str>,
    sort: PostSort,
) -> Result<Vec<PostWithStats>, ApiError> {
    let mut posts = api.list_posts().await?;
    if let Some(tag) = tag.filter(|tag| !tag.is_empty()) {
        posts.retain(|post| post.tag.eq_ignore_ascii_case(tag));
    }
    Ok(with_comment_counts(api, posts, sort).await)
}

/// Posts found by the tag search endpoint.
///
/// # Errors
///
/// Returns the API error when the search fails.
pub async fn search(
    api: &ApiClient,
    tag: &str,
    sort: PostSort,
) -> Result<Vec<PostWithStats>, ApiError> {
    let posts = api.search_posts(tag.trim()).await?;
    Ok(with_comment_counts(api, posts, sort).await)
}

/// Attach comment counts, fetched concurrently, then sort.
///
/// A post whose comments cannot be fetched shows zero comments.
async fn with_comment_counts(
    api: &ApiClient,
    posts: Vec<Post>,
    sort: PostSort,
) -> Vec<PostWithStats> {
    let counts = join_all(posts.iter().map(|post| api.list_comments(&post.id))).await;

    let mut listing: Vec<PostWithStats> = posts
        .into_iter()
        .zip(counts)
        .map(|(post, comments)| {
            let comment_count = comments.map_or_else(
                |e| {
                    tracing::debug!(post_id = %post.id, error = %e, "Comment count unavailable");
                    0
                },
                |comments| comments.len(),
            );
            PostWithStats {
                post,
                comment_count,
            }
        })
        .collect();

    sort_posts(&mut listing, sort);
    listing
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use vibehive_core::Role;
    use vibehive_core::session::ActorSource;

    use super::*;
    use crate::config::ApiConfig;

    /// A client pointed at a closed port; any request it sends fails.
    fn offline_api() -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(200),
        })
        .unwrap()
    }

    fn reader() -> CurrentUser {
        CurrentUser {
            uid: Some("uid-1".to_string()),
            email: "a@b.com".to_string(),
            name: String::new(),
            photo: None,
            role: Role::User,
            source: ActorSource::Identity,
        }
    }

    #[tokio::test]
    async fn test_anonymous_vote_is_rejected_before_sending() {
        let err = cast_vote(&offline_api(), None, &PostId::new("p1"), VoteType::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, ForumError::LoginRequired));
    }

    #[tokio::test]
    async fn test_blank_comment_is_rejected_before_sending() {
        let user = reader();
        let err = add_comment(&offline_api(), Some(&user), &PostId::new("p1"), "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, ForumError::EmptyComment));
    }

    #[tokio::test]
    async fn test_report_without_feedback_is_rejected_before_sending() {
        let user = reader();
        let err = report_comment(
            &offline_api(),
            Some(&user),
            &CommentId::new("c1"),
            &PostId::new("p1"),
            Some(""),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ForumError::MissingFeedback));
    }

    #[tokio::test]
    async fn test_api_failure_surfaces_on_vote() {
        let user = reader();
        let err = cast_vote(&offline_api(), Some(&user), &PostId::new("p1"), VoteType::Down)
            .await
            .unwrap_err();
        assert!(matches!(err, ForumError::Api(ApiError::Http(_))));
    }

    fn draft(title: &str, description: &str, tag: &str) -> PostDraft {
        PostDraft {
            title: title.to_string(),
            description: description.to_string(),
            tag: tag.to_string(),
        }
    }

    #[test]
    fn test_valid_draft_is_trimmed() {
        let (title, description, tag) = draft(" Hello ", " World ", "design")
            .validate()
            .unwrap();
        assert_eq!(title, "Hello");
        assert_eq!(description, "World");
        assert_eq!(tag, PostTag::Design);
    }

    #[test]
    fn test_draft_reports_each_missing_field() {
        let errors = draft("", " ", "").validate().unwrap_err();
        assert_eq!(errors.get("title"), Some("Title is required"));
        assert_eq!(errors.get("description"), Some("Description is required"));
        assert_eq!(errors.get("tag"), Some("Please select a tag"));
    }

    #[test]
    fn test_unknown_tag_is_rejected_on_write() {
        let errors = draft("t", "d", "gardening").validate().unwrap_err();
        assert_eq!(errors.get("tag"), Some("Please select a valid tag"));
    }
}
