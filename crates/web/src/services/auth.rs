//! Registration, login and logout.
//!
//! Accounts live with the identity provider; the forum API keeps a matching
//! user record (name, photo, role) created at registration. A successful
//! login stores the identity principal in the session, and an "admin mode"
//! login additionally stores the admin marker once the API confirms it.
//! Google sign-in ends the same way as a password login, creating the forum
//! record first when the account is new.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;
use vibehive_core::models::{NewUser, User};
use vibehive_core::password::check_password;
use vibehive_core::session::{AdminProfile, IdentityProfile};
use vibehive_core::{Email, Role};

use super::FieldErrors;
use crate::api::ApiError;
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::identity::IdentityError;
use crate::notice::Notice;
use crate::session::SessionStore;
use crate::state::AppState;

/// Errors from the auth flows.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The form failed validation; nothing was sent.
    #[error("{0}")]
    Invalid(FieldErrors),

    /// The identity provider refused or could not be reached.
    #[error("identity provider: {0}")]
    Identity(#[from] IdentityError),

    /// The account signed in but is not an admin.
    #[error("account is not an admin")]
    NotAdmin,

    /// The admin check itself failed.
    #[error("admin check failed: {0}")]
    AdminCheck(ApiError),

    /// The session could not be written.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Google sign-in is not configured.
    #[error("google sign-in is not configured")]
    GoogleUnavailable,
}

impl AuthError {
    /// Banner for this failure. `fallback` names the flow that failed.
    #[must_use]
    pub const fn notice(&self, fallback: Notice) -> Notice {
        match self {
            Self::Identity(err) => Notice::from_identity(err.code(), fallback),
            Self::NotAdmin => Notice::NotAdmin,
            Self::AdminCheck(_) => Notice::AdminVerifyFailed,
            Self::Session(_) => Notice::SessionError,
            Self::GoogleUnavailable => Notice::GoogleUnavailable,
            Self::Invalid(_) => fallback,
        }
    }
}

/// Registration form input.
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub photo_url: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterInput {
    /// Validate without calling anything.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<Email, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("name", &self.name, "Name is required");

        let email = if self.email.trim().is_empty() {
            errors.push("email", "Email is required");
            None
        } else {
            match Email::parse(&self.email) {
                Ok(email) => Some(email),
                Err(_) => {
                    errors.push("email", Notice::InvalidEmail.message());
                    None
                }
            }
        };

        if self.password.is_empty() {
            errors.push("password", "Password is required");
        } else if let Err(policy) = check_password(&self.password) {
            errors.push("password", policy.to_string());
        }
        if self.password != self.confirm_password {
            errors.push("confirm_password", "Passwords do not match");
        }

        match email {
            Some(email) => errors.into_result(email),
            None => Err(errors),
        }
    }

    fn photo(&self) -> Option<&str> {
        self.photo_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// What happened besides the account being created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registered {
    /// Whether `POST /users` succeeded.
    pub user_synced: bool,
}

/// Create an account, sync it to the forum API and sign the visitor in.
///
/// A failure to create the forum record does not undo the registration.
///
/// # Errors
///
/// Returns [`AuthError::Invalid`] before any request when the form is
/// invalid, and [`AuthError::Identity`] when sign-up fails.
#[instrument(skip(state, store, input), fields(email = %input.email))]
pub async fn register(
    state: &AppState,
    store: &SessionStore,
    input: &RegisterInput,
) -> Result<Registered, AuthError> {
    let email = input.validate().map_err(AuthError::Invalid)?;
    let name = input.name.trim().to_string();
    let photo = input.photo();

    let account = state
        .identity()
        .sign_up(email.as_str(), &input.password)
        .await?;

    if let Err(e) = state
        .identity()
        .update_profile(&account.id_token, &name, photo)
        .await
    {
        tracing::warn!(error = %e, "Failed to set identity profile after sign-up");
    }

    let record = NewUser {
        name: name.clone(),
        photo: photo.map(str::to_string),
        email: account.email.clone(),
        uid: account.local_id.clone(),
        created_at: Utc::now(),
        provider: None,
    };
    let user_synced = match state.api().create_user(&record).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to create forum user record");
            false
        }
    };

    store
        .set_identity(&IdentityProfile {
            uid: account.local_id.clone(),
            email: account.email.clone(),
            display_name: Some(name),
            photo_url: photo.map(str::to_string),
            role: Some(Role::User),
        })
        .await?;

    set_sentry_user(&account.local_id, Some(&account.email));
    add_breadcrumb("auth", "Registered", None);
    tracing::info!(uid = %account.local_id, user_synced, "User registered");

    Ok(Registered { user_synced })
}

/// Login form input.
#[derive(Debug, Clone, Default)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    /// Sign in as an admin.
    pub admin: bool,
}

impl LoginInput {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("email", &self.email, "Email is required");
        if self.password.is_empty() {
            errors.push("password", "Password is required");
        }
        errors.into_result(())
    }
}

/// Sign in and store the session.
///
/// The forum user record is fetched best-effort to fill in name, photo and
/// role. In admin mode the account must be confirmed by the admin check, or
/// nothing is stored.
///
/// # Errors
///
/// Returns [`AuthError::Identity`] for rejected credentials and
/// [`AuthError::NotAdmin`] when admin mode is refused.
#[instrument(skip(state, store, input), fields(email = %input.email, admin = input.admin))]
pub async fn login(
    state: &AppState,
    store: &SessionStore,
    input: &LoginInput,
) -> Result<(), AuthError> {
    input.validate().map_err(AuthError::Invalid)?;

    let account = state
        .identity()
        .sign_in(input.email.trim(), &input.password)
        .await?;

    let record = fetch_forum_user(state, &account.email).await;
    let identity = signed_in_profile(
        account.local_id,
        account.email,
        account.display_name,
        account.photo_url,
        record.as_ref(),
    );

    if input.admin {
        let check = state
            .api()
            .check_admin(&identity.email)
            .await
            .map_err(AuthError::AdminCheck)?;
        if !check.is_admin {
            tracing::info!("Admin login refused");
            return Err(AuthError::NotAdmin);
        }

        let mut profile = AdminProfile::from(check);
        profile.name = profile.name.or_else(|| identity.display_name.clone());
        profile.photo = profile.photo.or_else(|| identity.photo_url.clone());
        profile.email = profile.email.or_else(|| Some(identity.email.clone()));

        store.set_identity(&identity).await?;
        store.set_admin_marker(&identity.email, &profile).await?;
    } else {
        store.set_identity(&identity).await?;
    }

    set_sentry_user(&identity.uid, Some(&identity.email));
    add_breadcrumb("auth", "Logged in", None);
    tracing::info!(uid = %identity.uid, "User logged in");
    Ok(())
}

/// Best-effort read of the forum record at sign-in.
async fn fetch_forum_user(state: &AppState, email: &str) -> Option<User> {
    match state.api().get_user(email).await {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch forum user record at sign-in");
            None
        }
    }
}

/// Session profile from the identity account, preferring the forum record's
/// name and photo.
fn signed_in_profile(
    uid: String,
    email: String,
    display_name: Option<String>,
    photo_url: Option<String>,
    record: Option<&User>,
) -> IdentityProfile {
    IdentityProfile {
        uid,
        email,
        display_name: record
            .map(|user| user.name.clone())
            .filter(|name| !name.trim().is_empty())
            .or(display_name),
        photo_url: record.and_then(|user| user.photo.clone()).or(photo_url),
        role: record.map(|user| user.role),
    }
}

/// Finish a Google sign-in from the authorization code.
///
/// The code is exchanged for a Google ID token, which the identity provider
/// turns into an account. A new account gets its forum record first; as with
/// registration, a failed `POST /users` does not undo the sign-in.
///
/// # Errors
///
/// Returns [`AuthError::GoogleUnavailable`] when Google is not configured and
/// [`AuthError::Identity`] when Google or the identity provider refuse.
#[instrument(skip(state, store, code))]
pub async fn google_sign_in(
    state: &AppState,
    store: &SessionStore,
    code: &str,
    redirect_uri: &str,
) -> Result<Registered, AuthError> {
    let google = state.google().ok_or(AuthError::GoogleUnavailable)?;
    let google_id_token = google.exchange_code(code, redirect_uri).await?;
    let account = state
        .identity()
        .sign_in_with_idp(&google_id_token, redirect_uri)
        .await?;

    let mut user_synced = true;
    if account.is_new_user {
        let record = NewUser {
            name: account
                .display_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "Google User".to_string()),
            photo: account.photo_url.clone(),
            email: account.email.clone(),
            uid: account.local_id.clone(),
            created_at: Utc::now(),
            provider: Some("google".to_string()),
        };
        if let Err(e) = state.api().create_user(&record).await {
            tracing::warn!(error = %e, "Failed to create forum user record for Google account");
            user_synced = false;
        }
    }

    let record = fetch_forum_user(state, &account.email).await;
    let identity = signed_in_profile(
        account.local_id,
        account.email,
        account.display_name,
        account.photo_url,
        record.as_ref(),
    );
    store.set_identity(&identity).await?;

    set_sentry_user(&identity.uid, Some(&identity.email));
    add_breadcrumb("auth", "Signed in with Google", None);
    tracing::info!(uid = %identity.uid, new_user = account.is_new_user, "Google sign-in");
    Ok(Registered { user_synced })
}

/// Sign out: clears the identity session and the admin marker together.
///
/// # Errors
///
/// Returns an error if the session cannot be cleared.
pub async fn logout(store: &SessionStore) -> Result<(), AuthError> {
    store.clear().await?;
    clear_sentry_user();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn register_input() -> RegisterInput {
        RegisterInput {
            name: "Ann".to_string(),
            email: "a@b.com".to_string(),
            photo_url: Some("  ".to_string()),
            password: "Abc123".to_string(),
            confirm_password: "Abc123".to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        let input = register_input();
        assert_eq!(input.validate().unwrap().as_str(), "a@b.com");
        assert_eq!(input.photo(), None);
    }

    #[test]
    fn test_registration_reports_every_field() {
        let input = RegisterInput {
            name: " ".to_string(),
            email: "not-an-email".to_string(),
            password: "abc".to_string(),
            confirm_password: "abd".to_string(),
            photo_url: None,
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(errors.get("email"), Some(Notice::InvalidEmail.message()));
        assert_eq!(
            errors.get("password"),
            Some(
                "At least 6 characters, At least one number (0-9) or a symbol, Lowercase (a-z) and uppercase (A-Z)"
            )
        );
        assert_eq!(errors.get("confirm_password"), Some("Passwords do not match"));
    }

    #[test]
    fn test_login_requires_both_fields() {
        let errors = LoginInput::default().validate().unwrap_err();
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
    }

    #[test]
    fn test_signed_in_profile_prefers_forum_record() {
        let record: User = serde_json::from_value(serde_json::json!({
            "_id": "u1",
            "name": "Ann Forum",
            "email": "a@b.com",
            "photo": "https://img.example/ann.png",
            "role": "admin",
        }))
        .unwrap();
        let profile = signed_in_profile(
            "uid-1".to_string(),
            "a@b.com".to_string(),
            Some("Ann Google".to_string()),
            None,
            Some(&record),
        );
        assert_eq!(profile.display_name.as_deref(), Some("Ann Forum"));
        assert_eq!(profile.photo_url.as_deref(), Some("https://img.example/ann.png"));
        assert_eq!(profile.role, Some(Role::Admin));

        let profile = signed_in_profile(
            "uid-1".to_string(),
            "a@b.com".to_string(),
            Some("Ann Google".to_string()),
            None,
            None,
        );
        assert_eq!(profile.display_name.as_deref(), Some("Ann Google"));
        assert_eq!(profile.role, None);
    }

    #[test]
    fn test_error_notices() {
        assert_eq!(AuthError::NotAdmin.notice(Notice::LoginFailed), Notice::NotAdmin);
        assert_eq!(
            AuthError::GoogleUnavailable.notice(Notice::GoogleFailed),
            Notice::GoogleUnavailable
        );
        assert_eq!(
            AuthError::Invalid(FieldErrors::new()).notice(Notice::LoginFailed),
            Notice::LoginFailed
        );
        assert_eq!(
            AuthError::Identity(IdentityError::Parse("x".to_string()))
                .notice(Notice::RegistrationFailed),
            Notice::RegistrationFailed
        );
    }
}
