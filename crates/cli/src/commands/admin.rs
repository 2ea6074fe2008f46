//! Admin and user management commands.
//!
//! # Usage
//!
//! ```bash
//! vh-cli admin check ann@example.com
//! vh-cli admin promote 665f1c2a9b3e
//! vh-cli users list
//! ```

use vibehive_core::UserId;
use vibehive_core::models::User;
use vibehive_web::api::ApiClient;
use vibehive_web::services::admin::{self, Promotion};

use super::CommandError;

/// Report whether `email` belongs to an admin.
///
/// # Errors
///
/// Returns error if the email is blank or the API call fails.
pub async fn check(api: &ApiClient, email: &str) -> Result<(), CommandError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(CommandError::InvalidInput("email is empty".to_owned()));
    }

    let check = api.check_admin(email).await?;
    if check.is_admin {
        tracing::info!(
            "{email} is an admin ({})",
            check.name.as_deref().unwrap_or("no name on record")
        );
    } else {
        tracing::info!("{email} is not an admin");
    }
    Ok(())
}

/// Promote a user to admin.
///
/// # Errors
///
/// Returns error if the id is blank or the API call fails.
pub async fn promote(api: &ApiClient, user_id: &str) -> Result<(), CommandError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(CommandError::InvalidInput("user id is empty".to_owned()));
    }

    match admin::promote_user(api, &UserId::new(user_id)).await? {
        Promotion::Promoted => tracing::info!("User {user_id} promoted to admin"),
        Promotion::AlreadyAdmin => tracing::warn!("User {user_id} is already an admin"),
    }
    Ok(())
}

/// List every user with role and plan.
///
/// # Errors
///
/// Returns error if the API call fails.
pub async fn list_users(api: &ApiClient) -> Result<(), CommandError> {
    let users = api.list_users().await?;
    tracing::info!("{} users", users.len());
    for user in &users {
        tracing::info!("{}", user_line(user));
    }
    Ok(())
}

fn user_line(user: &User) -> String {
    let plan = user
        .membership
        .as_ref()
        .filter(|m| m.is_active)
        .map_or("free", |m| m.plan.as_str());
    format!(
        "{id}  {email}  {name}  role={role}  plan={plan}",
        id = user.id,
        email = user.email,
        name = user.name,
        role = user.role,
    )
}
