//! Entity shapes exchanged with the remote forum API.
//!
//! Field names follow the API's camelCase JSON; ids arrive as `_id`.
//! Read shapes are lenient (most fields default when absent) because the API
//! has accumulated records from several client versions. Write shapes are
//! strict and only carry what the API expects.

mod announcement;
mod post;
mod user;

pub use announcement::{Announcement, ForumStats, NewAnnouncement, NewTag, TagRecord};
pub use post::{
    Comment, CommentReport, NewComment, NewPost, Post, PostSort, PostUpdate, PostWithStats,
    ReportFeedback, ReportRequest, VoteRequest, sort_posts,
};
pub use user::{AdminCheck, Membership, NewMembership, NewUser, User};
