use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CommentId, PostId, PostTag, VoteType};

/// A forum post. Vote counters are owned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: PostId,
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
    /// Raw tag string. Older records may carry tags outside [`PostTag`].
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub up_vote: i64,
    #[serde(default)]
    pub down_vote: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    /// The tag, if it is one of the known set.
    #[must_use]
    pub fn known_tag(&self) -> Option<PostTag> {
        self.tag.parse().ok()
    }

    #[must_use]
    pub fn is_authored_by(&self, email: &str) -> bool {
        !email.is_empty() && self.author_email.eq_ignore_ascii_case(email)
    }
}

/// Body of `POST /posts`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub tag: PostTag,
    pub author_name: String,
    pub author_email: String,
    pub author_image: Option<String>,
    pub up_vote: i64,
    pub down_vote: i64,
    pub created_at: DateTime<Utc>,
}

/// Body of `PUT /posts/:id`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    pub title: String,
    pub description: String,
    pub tag: PostTag,
}

/// Body of `PATCH /posts/:id/vote`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub vote_type: VoteType,
    pub user_email: String,
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: CommentId,
    #[serde(default)]
    pub post_id: Option<PostId>,
    /// Comment body.
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_reported: bool,
    #[serde(default)]
    pub reports: Vec<CommentReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentReport {
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub reported_by: Option<String>,
    #[serde(default)]
    pub reported_at: Option<DateTime<Utc>>,
}

/// Body of `POST /posts/:id/comments`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub comment: String,
    pub user_email: String,
    pub user_name: String,
}

/// Reasons a reader may give when reporting a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFeedback {
    Inappropriate,
    Misleading,
    Spam,
}

impl ReportFeedback {
    pub const ALL: [Self; 3] = [Self::Inappropriate, Self::Misleading, Self::Spam];

    /// The sentence stored with the report.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Inappropriate => "Inappropriate content",
            Self::Misleading => "Misleading information",
            Self::Spam => "Spam or promotional content",
        }
    }

    /// Form value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inappropriate => "inappropriate",
            Self::Misleading => "misleading",
            Self::Spam => "spam",
        }
    }
}

impl std::str::FromStr for ReportFeedback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|feedback| feedback.as_str() == s || feedback.message() == s)
            .ok_or_else(|| format!("invalid report feedback: {s}"))
    }
}

/// Body of `POST /comments/:id/report`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub feedback: String,
    pub post_id: PostId,
}

/// Listing orders offered on the home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    #[default]
    Newest,
    Oldest,
    Popular,
    MostComments,
}

impl PostSort {
    pub const ALL: [Self; 4] = [Self::Newest, Self::Oldest, Self::Popular, Self::MostComments];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::Popular => "popular",
            Self::MostComments => "comments",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::Oldest => "Oldest",
            Self::Popular => "Most popular",
            Self::MostComments => "Most comments",
        }
    }
}

impl std::str::FromStr for PostSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s)
            .ok_or_else(|| format!("invalid sort order: {s}"))
    }
}

/// A post together with its comment count, as listed on the home page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostWithStats {
    pub post: Post,
    pub comment_count: usize,
}

/// Sort posts in place.
///
/// Posts without a creation time sort as the oldest. Ties keep the API's
/// original order.
pub fn sort_posts(posts: &mut [PostWithStats], order: PostSort) {
    match order {
        PostSort::Newest => posts.sort_by(|a, b| b.post.created_at.cmp(&a.post.created_at)),
        PostSort::Oldest => posts.sort_by(|a, b| a.post.created_at.cmp(&b.post.created_at)),
        PostSort::Popular => posts.sort_by(|a, b| b.post.up_vote.cmp(&a.post.up_vote)),
        PostSort::MostComments => posts.sort_by(|a, b| b.comment_count.cmp(&a.comment_count)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn post(id: &str, day: u32, up_vote: i64) -> Post {
        Post {
            id: PostId::new(id),
            title: format!("Post {id}"),
            description: String::new(),
            author_name: "Ann".to_owned(),
            author_email: "ann@example.com".to_owned(),
            author_image: None,
            tag: "design".to_owned(),
            up_vote,
            down_vote: 0,
            created_at: Some(Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0).unwrap()),
        }
    }

    fn listing() -> Vec<PostWithStats> {
        vec![
            PostWithStats { post: post("a", 1, 5), comment_count: 2 },
            PostWithStats { post: post("b", 3, 1), comment_count: 7 },
            PostWithStats { post: post("c", 2, 9), comment_count: 0 },
        ]
    }

    fn ids(posts: &[PostWithStats]) -> Vec<&str> {
        posts.iter().map(|p| p.post.id.as_str()).collect()
    }

    #[test]
    fn test_sort_newest_and_oldest() {
        let mut posts = listing();
        sort_posts(&mut posts, PostSort::Newest);
        assert_eq!(ids(&posts), ["b", "c", "a"]);
        sort_posts(&mut posts, PostSort::Oldest);
        assert_eq!(ids(&posts), ["a", "c", "b"]);
    }

    #[test]
    fn test_sort_popular_by_upvotes() {
        let mut posts = listing();
        sort_posts(&mut posts, PostSort::Popular);
        assert_eq!(ids(&posts), ["c", "a", "b"]);
    }

    #[test]
    fn test_sort_most_comments() {
        let mut posts = listing();
        sort_posts(&mut posts, PostSort::MostComments);
        assert_eq!(ids(&posts), ["b", "a", "c"]);
    }

    #[test]
    fn test_unknown_tag_is_kept_verbatim() {
        let post: Post = serde_json::from_str(r#"{"_id":"p1","tag":"gardening"}"#).unwrap();
        assert_eq!(post.tag, "gardening");
        assert!(post.known_tag().is_none());
        assert_eq!(post.up_vote, 0);
    }

    #[test]
    fn test_is_authored_by_ignores_case() {
        let post = post("a", 1, 0);
        assert!(post.is_authored_by("ANN@example.com"));
        assert!(!post.is_authored_by(""));
    }

    #[test]
    fn test_report_feedback_accepts_value_or_message() {
        assert_eq!(
            "spam".parse::<ReportFeedback>().unwrap(),
            ReportFeedback::Spam
        );
        assert_eq!(
            "Misleading information".parse::<ReportFeedback>().unwrap(),
            ReportFeedback::Misleading
        );
        assert!("rude".parse::<ReportFeedback>().is_err());
    }
}
