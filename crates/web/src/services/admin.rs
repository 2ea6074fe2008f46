//! Admin actions: promoting users, announcements and tags.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;
use vibehive_core::models::NewAnnouncement;
use vibehive_core::session::CurrentUser;
use vibehive_core::{TagId, UserId};

use crate::api::{ApiClient, ApiError};
use crate::error::add_breadcrumb;

/// Errors from admin actions.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("title and description are required")]
    MissingAnnouncementFields,

    #[error("tag name is empty")]
    EmptyTag,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result of a promotion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    Promoted,
    /// The user was already an admin; nothing was sent.
    AlreadyAdmin,
}

/// Promote a user to admin.
///
/// # Errors
///
/// Returns the API error.
#[instrument(skip(api), fields(user_id = %user_id))]
pub async fn promote_user(api: &ApiClient, user_id: &UserId) -> Result<Promotion, AdminError> {
    let users = api.list_users().await?;
    if users
        .iter()
        .any(|user| user.id == *user_id && user.role.is_admin())
    {
        return Ok(Promotion::AlreadyAdmin);
    }

    api.make_admin(user_id).await?;
    add_breadcrumb("admin", "Promoted user", Some(&[("user_id", user_id.as_str())]));
    tracing::info!(user_id = %user_id, "User promoted to admin");
    Ok(Promotion::Promoted)
}

/// Announcement form input.
#[derive(Debug, Clone, Default)]
pub struct AnnouncementDraft {
    pub title: String,
    pub description: String,
}

/// Publish an announcement signed by `author`.
///
/// # Errors
///
/// [`AdminError::MissingAnnouncementFields`] without a request, otherwise the
/// API error.
#[instrument(skip(api, author, draft), fields(author = %author.email))]
pub async fn post_announcement(
    api: &ApiClient,
    author: &CurrentUser,
    draft: &AnnouncementDraft,
) -> Result<(), AdminError> {
    let title = draft.title.trim();
    let description = draft.description.trim();
    if title.is_empty() || description.is_empty() {
        return Err(AdminError::MissingAnnouncementFields);
    }

    api.create_announcement(&NewAnnouncement {
        title: title.to_string(),
        description: description.to_string(),
        author_name: author.name.clone(),
        author_email: author.email.clone(),
        author_image: author.photo.clone(),
        created_at: Utc::now(),
    })
    .await?;
    Ok(())
}

/// Add a filter tag.
///
/// # Errors
///
/// [`AdminError::EmptyTag`] for blank names, otherwise the API error.
pub async fn add_tag(api: &ApiClient, name: &str) -> Result<(), AdminError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AdminError::EmptyTag);
    }
    api.add_tag(name).await?;
    Ok(())
}

/// Remove a filter tag.
///
/// # Errors
///
/// Returns the API error.
pub async fn delete_tag(api: &ApiClient, id: &TagId) -> Result<(), AdminError> {
    api.delete_tag(id).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use vibehive_core::Role;
    use vibehive_core::session::ActorSource;

    use super::*;
    use crate::config::ApiConfig;

    fn offline_api() -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(200),
        })
        .unwrap()
    }

    fn admin() -> CurrentUser {
        CurrentUser {
            uid: None,
            email: "boss@example.com".to_string(),
            name: "Boss".to_string(),
            photo: None,
            role: Role::Admin,
            source: ActorSource::AdminMarker,
        }
    }

    #[tokio::test]
    async fn test_announcement_requires_both_fields() {
        let draft = AnnouncementDraft {
            title: "Maintenance".to_string(),
            description: "  ".to_string(),
        };
        let err = post_announcement(&offline_api(), &admin(), &draft)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::MissingAnnouncementFields));
    }

    #[tokio::test]
    async fn test_blank_tag_is_rejected() {
        let err = add_tag(&offline_api(), " ").await.unwrap_err();
        assert!(matches!(err, AdminError::EmptyTag));
    }
}
