use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use vibehive_core::envelope::{parse_entity, parse_list};
use vibehive_core::models::{
    AdminCheck, Announcement, Comment, ForumStats, Membership, NewAnnouncement, NewComment,
    NewMembership, NewPost, NewTag, NewUser, Post, PostUpdate, ReportRequest, TagRecord, User,
    VoteRequest,
};
use vibehive_core::{CommentId, PostId, TagId, UserId};

use super::ApiError;
use super::cache::{CacheKey, CacheValue};
use crate::config::ApiConfig;

/// How long tags and stats stay cached.
const CACHE_TTL: Duration = Duration::from_secs(60);

/// Longest response excerpt written to logs.
const LOG_BODY_LIMIT: usize = 500;

/// Client for the remote forum API.
///
/// Cheap to clone; all clones share one connection pool and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new forum API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("vibehive-web/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                cache,
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Send a request and decode the JSON body.
    ///
    /// Empty bodies decode as `null`.
    async fn send(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if status != StatusCode::NOT_FOUND {
                tracing::error!(
                    status = %status,
                    body = %truncate(&body),
                    "Forum API returned non-success status"
                );
            }
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&body),
                "Failed to parse forum API response"
            );
            ApiError::Parse(e.to_string())
        })
    }

    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.send(self.inner.client.get(self.url(path))).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        self.send(self.inner.client.request(method, self.url(path)).json(body))
            .await
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// List every post.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body has an unexpected shape.
    #[instrument(skip(self))]
    pub async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
        Ok(parse_list(self.get("/posts").await?)?)
    }

    /// List posts written by `email`.
    ///
    /// The endpoint also answers `{ "posts": [...] }`, which is unwrapped here.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body has an unexpected shape.
    #[instrument(skip(self))]
    pub async fn list_posts_by_author(&self, email: &str) -> Result<Vec<Post>, ApiError> {
        let mut body = self.get(&format!("/posts/{}", segment(email))).await?;
        if let Some(posts) = body.get_mut("posts").map(Value::take) {
            body = posts;
        }
        Ok(parse_list(body)?)
    }

    /// List posts carrying `tag`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body has an unexpected shape.
    #[instrument(skip(self))]
    pub async fn search_posts(&self, tag: &str) -> Result<Vec<Post>, ApiError> {
        Ok(parse_list(
            self.get(&format!("/posts/search/{}", segment(tag))).await?,
        )?)
    }

    /// Fetch a single post.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, including 404 for unknown ids.
    #[instrument(skip(self), fields(post_id = %id))]
    pub async fn get_post(&self, id: &PostId) -> Result<Post, ApiError> {
        let body = self.get(&format!("/posts/post/{}", segment(id.as_str()))).await?;
        Ok(parse_entity(body, "post")?)
    }

    /// Create a post.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, post), fields(author = %post.author_email))]
    pub async fn create_post(&self, post: &NewPost) -> Result<(), ApiError> {
        self.send_json(Method::POST, "/posts", post).await?;
        self.inner.cache.invalidate(&CacheKey::ForumStats).await;
        Ok(())
    }

    /// Replace a post's editable fields.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, update), fields(post_id = %id))]
    pub async fn update_post(&self, id: &PostId, update: &PostUpdate) -> Result<(), ApiError> {
        self.send_json(Method::PUT, &format!("/posts/{}", segment(id.as_str())), update)
            .await?;
        Ok(())
    }

    /// Delete a post on behalf of its author.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self), fields(post_id = %id))]
    pub async fn delete_post(&self, id: &PostId, author_email: &str) -> Result<(), ApiError> {
        let url = self.url(&format!(
            "/posts/{}?email={}",
            segment(id.as_str()),
            segment(author_email)
        ));
        self.send(self.inner.client.delete(url)).await?;
        self.inner.cache.invalidate(&CacheKey::ForumStats).await;
        Ok(())
    }

    /// Record a vote and return the post as the server now sees it.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the updated post is missing.
    #[instrument(skip(self, vote), fields(post_id = %id, vote = ?vote.vote_type))]
    pub async fn vote(&self, id: &PostId, vote: &VoteRequest) -> Result<Post, ApiError> {
        let body = self
            .send_json(
                Method::PATCH,
                &format!("/posts/{}/vote", segment(id.as_str())),
                vote,
            )
            .await?;
        Ok(parse_entity(body, "post")?)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// List comments on a post.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body has an unexpected shape.
    #[instrument(skip(self), fields(post_id = %post_id))]
    pub async fn list_comments(&self, post_id: &PostId) -> Result<Vec<Comment>, ApiError> {
        Ok(parse_list(
            self.get(&format!("/posts/{}/comments", segment(post_id.as_str())))
                .await?,
        )?)
    }

    /// Add a comment to a post.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, comment), fields(post_id = %post_id))]
    pub async fn add_comment(&self, post_id: &PostId, comment: &NewComment) -> Result<(), ApiError> {
        self.send_json(
            Method::POST,
            &format!("/posts/{}/comments", segment(post_id.as_str())),
            comment,
        )
        .await?;
        self.inner.cache.invalidate(&CacheKey::ForumStats).await;
        Ok(())
    }

    /// Report a comment for moderation.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, report), fields(comment_id = %comment_id))]
    pub async fn report_comment(
        &self,
        comment_id: &CommentId,
        report: &ReportRequest,
    ) -> Result<(), ApiError> {
        self.send_json(
            Method::POST,
            &format!("/comments/{}/report", segment(comment_id.as_str())),
            report,
        )
        .await?;
        Ok(())
    }

    /// List comments awaiting moderation.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body has an unexpected shape.
    #[instrument(skip(self))]
    pub async fn reported_comments(&self) -> Result<Vec<Comment>, ApiError> {
        Ok(parse_list(self.get("/reported-comments").await?)?)
    }

    // =========================================================================
    // Users & Memberships
    // =========================================================================

    /// List every user.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body has an unexpected shape.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        Ok(parse_list(self.get("/users").await?)?)
    }

    /// Fetch a user by email. `None` when the API has no record.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails for any reason other than 404.
    #[instrument(skip(self))]
    pub async fn get_user(&self, email: &str) -> Result<Option<User>, ApiError> {
        match self.get(&format!("/users/{}", segment(email))).await {
            Ok(Value::Null) => Ok(None),
            Ok(body) => Ok(Some(parse_entity(body, "user")?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create the forum record for a freshly registered identity.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub async fn create_user(&self, user: &NewUser) -> Result<(), ApiError> {
        self.send_json(Method::POST, "/users", user).await?;
        self.inner.cache.invalidate(&CacheKey::ForumStats).await;
        Ok(())
    }

    /// Promote a user to admin.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn make_admin(&self, id: &UserId) -> Result<(), ApiError> {
        self.send_json(
            Method::PATCH,
            &format!("/users/make-admin/{}", segment(id.as_str())),
            &serde_json::json!({}),
        )
        .await?;
        Ok(())
    }

    /// Fetch the membership for `email` (lowercased by the caller).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails for any reason other than 404.
    #[instrument(skip(self))]
    pub async fn get_membership(&self, email: &str) -> Result<Option<Membership>, ApiError> {
        match self
            .get(&format!("/users/membership/{}", segment(email)))
            .await
        {
            Ok(Value::Null) => Ok(None),
            Ok(body) => Ok(Some(parse_entity(body, "membership")?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create or replace a membership.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, membership), fields(email = %membership.email, plan = %membership.plan))]
    pub async fn create_membership(&self, membership: &NewMembership) -> Result<(), ApiError> {
        self.send_json(Method::POST, "/users/membership", membership)
            .await?;
        Ok(())
    }

    /// Ask whether `email` belongs to an admin.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is not an admin check.
    #[instrument(skip(self))]
    pub async fn check_admin(&self, email: &str) -> Result<AdminCheck, ApiError> {
        let body = self
            .get(&format!("/admin/check/{}", segment(email)))
            .await?;
        serde_json::from_value(body).map_err(|e| ApiError::Parse(e.to_string()))
    }

    // =========================================================================
    // Tags & Stats (cached)
    // =========================================================================

    /// List admin-managed tags.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body has an unexpected shape.
    #[instrument(skip(self))]
    pub async fn list_tags(&self) -> Result<Vec<TagRecord>, ApiError> {
        if let Some(CacheValue::Tags(tags)) = self.inner.cache.get(&CacheKey::Tags).await {
            debug!("Cache hit for tags");
            return Ok(tags);
        }

        let tags: Vec<TagRecord> = parse_list(self.get("/tags").await?)?;
        self.inner
            .cache
            .insert(CacheKey::Tags, CacheValue::Tags(tags.clone()))
            .await;
        Ok(tags)
    }

    /// Add a tag.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn add_tag(&self, name: &str) -> Result<(), ApiError> {
        let tag = NewTag {
            name: name.to_string(),
        };
        self.send_json(Method::POST, "/tags", &tag).await?;
        self.inner.cache.invalidate(&CacheKey::Tags).await;
        Ok(())
    }

    /// Delete a tag.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self), fields(tag_id = %id))]
    pub async fn delete_tag(&self, id: &TagId) -> Result<(), ApiError> {
        self.send(
            self.inner
                .client
                .delete(self.url(&format!("/tags/{}", segment(id.as_str())))),
        )
        .await?;
        self.inner.cache.invalidate(&CacheKey::Tags).await;
        Ok(())
    }

    /// Aggregate forum counters.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is not a stats object.
    #[instrument(skip(self))]
    pub async fn forum_stats(&self) -> Result<ForumStats, ApiError> {
        if let Some(CacheValue::ForumStats(stats)) =
            self.inner.cache.get(&CacheKey::ForumStats).await
        {
            debug!("Cache hit for forum stats");
            return Ok(stats);
        }

        let stats: ForumStats = parse_entity(self.get("/forum-stats").await?, "data")?;
        self.inner
            .cache
            .insert(CacheKey::ForumStats, CacheValue::ForumStats(stats))
            .await;
        Ok(stats)
    }

    // =========================================================================
    // Announcements
    // =========================================================================

    /// List announcements.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body has an unexpected shape.
    #[instrument(skip(self))]
    pub async fn list_announcements(&self) -> Result<Vec<Announcement>, ApiError> {
        Ok(parse_list(self.get("/announcements").await?)?)
    }

    /// Publish an announcement.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, announcement), fields(title = %announcement.title))]
    pub async fn create_announcement(
        &self,
        announcement: &NewAnnouncement,
    ) -> Result<(), ApiError> {
        self.send_json(Method::POST, "/announcements", announcement)
            .await?;
        Ok(())
    }
}

/// Percent-encode a single path segment or query value.
fn segment(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}

/// Pull a human-readable message out of an error body.
///
/// The API answers errors as `{"message": "..."}` or `{"error": "..."}`.
/// Anything else (HTML error pages, empty bodies) yields an empty string.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return String::new();
    };
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}
