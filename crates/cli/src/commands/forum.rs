//! Forum-wide commands: statistics and announcements.

use vibehive_core::Role;
use vibehive_core::session::{ActorSource, CurrentUser};
use vibehive_web::api::ApiClient;
use vibehive_web::services::admin::{self, AnnouncementDraft};

use super::CommandError;

/// Print the forum counters.
///
/// # Errors
///
/// Returns error if the API call fails.
pub async fn stats(api: &ApiClient) -> Result<(), CommandError> {
    let stats = api.forum_stats().await?;
    tracing::info!(
        "posts={} comments={} users={}",
        stats.total_posts,
        stats.total_comments,
        stats.total_users
    );
    Ok(())
}

/// Publish an announcement signed by the given author.
///
/// # Errors
///
/// Returns error if a field is blank or the API call fails.
pub async fn announce(
    api: &ApiClient,
    title: &str,
    description: &str,
    author_name: &str,
    author_email: &str,
) -> Result<(), CommandError> {
    if author_email.trim().is_empty() {
        return Err(CommandError::InvalidInput("author email is empty".to_owned()));
    }

    let author = CurrentUser {
        uid: None,
        email: author_email.trim().to_owned(),
        name: author_name.trim().to_owned(),
        photo: None,
        role: Role::Admin,
        source: ActorSource::AdminMarker,
    };
    let draft = AnnouncementDraft {
        title: title.to_owned(),
        description: description.to_owned(),
    };

    admin::post_announcement(api, &author, &draft).await?;
    tracing::info!("Announcement \"{}\" published", draft.title.trim());
    Ok(())
}
