//! Per-visitor session state.
//!
//! [`SessionStore`] is the only place that reads or writes session keys. It
//! wraps the tower-sessions [`Session`] and memoizes the resolved
//! [`CurrentUser`] for the rest of the request; every write drops the memo.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_sessions::Session;
use vibehive_core::session::{
    AdminProfile, CurrentUser, IdentityProfile, StoredSession, resolve_current_user,
};

/// Session keys.
pub mod keys {
    /// Identity provider principal ([`vibehive_core::session::IdentityProfile`]).
    pub const IDENTITY: &str = "identity";
    /// Admin marker email.
    pub const ADMIN_EMAIL: &str = "admin_email";
    /// Admin marker profile, stored as a raw JSON string.
    pub const ADMIN_PROFILE: &str = "admin_profile";
    /// When the visitor last looked at announcements.
    pub const ANNOUNCEMENTS_CHECKED_AT: &str = "announcements_checked_at";
    /// Google sign-in in progress ([`super::PendingGoogleSignIn`]).
    pub const GOOGLE_SIGN_IN: &str = "google_sign_in";
}

/// A Google sign-in waiting for its callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingGoogleSignIn {
    /// CSRF token echoed back by Google.
    pub state: String,
    /// Where to send the visitor afterwards.
    pub redirect: String,
}

type SessionResult<T> = Result<T, tower_sessions::session::Error>;

/// Session-backed store for identity, admin marker and notification state.
#[derive(Clone)]
pub struct SessionStore {
    session: Session,
    memo: Arc<RwLock<Option<Option<CurrentUser>>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session,
            memo: Arc::new(RwLock::new(None)),
        }
    }

    /// Resolve the current actor, memoized until the next write.
    pub async fn current_user(&self) -> Option<CurrentUser> {
        if let Some(cached) = self.memo.read().await.as_ref() {
            return cached.clone();
        }

        let identity: Option<IdentityProfile> = self.get_lenient(keys::IDENTITY).await;
        let (admin_email, admin_profile) = self.admin_marker().await;
        let user = resolve_current_user(StoredSession {
            identity: identity.as_ref(),
            admin_email: admin_email.as_deref(),
            admin_profile: admin_profile.as_deref(),
        });

        *self.memo.write().await = Some(user.clone());
        user
    }

    /// Raw admin marker: stored email and profile blob.
    pub async fn admin_marker(&self) -> (Option<String>, Option<String>) {
        let email = self.get_lenient(keys::ADMIN_EMAIL).await;
        let profile = self.get_lenient(keys::ADMIN_PROFILE).await;
        (email, profile)
    }

    /// Store the identity principal after sign-in.
    ///
    /// Any admin marker left by a previous sign-in is dropped, since the
    /// marker outranks the identity when resolving the actor. The session id
    /// is rotated to prevent fixation.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn set_identity(&self, identity: &IdentityProfile) -> SessionResult<()> {
        self.session.cycle_id().await?;
        self.session.remove::<String>(keys::ADMIN_EMAIL).await?;
        self.session.remove::<String>(keys::ADMIN_PROFILE).await?;
        self.session.insert(keys::IDENTITY, identity).await?;
        self.invalidate().await;
        Ok(())
    }

    /// Store the admin marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn set_admin_marker(&self, email: &str, profile: &AdminProfile) -> SessionResult<()> {
        let blob = serde_json::to_string(profile)?;
        self.session.insert(keys::ADMIN_EMAIL, email).await?;
        self.session.insert(keys::ADMIN_PROFILE, blob).await?;
        self.invalidate().await;
        Ok(())
    }

    /// Remove the admin marker, leaving any identity session in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn clear_admin_marker(&self) -> SessionResult<()> {
        self.session.remove::<String>(keys::ADMIN_EMAIL).await?;
        self.session.remove::<String>(keys::ADMIN_PROFILE).await?;
        self.invalidate().await;
        Ok(())
    }

    /// Sign out: remove the identity session and the admin marker together,
    /// then drop the whole session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn clear(&self) -> SessionResult<()> {
        self.session
            .remove::<IdentityProfile>(keys::IDENTITY)
            .await?;
        self.session.remove::<String>(keys::ADMIN_EMAIL).await?;
        self.session.remove::<String>(keys::ADMIN_PROFILE).await?;
        self.session.flush().await?;
        *self.memo.write().await = Some(None);
        Ok(())
    }

    /// When the visitor last looked at announcements.
    pub async fn last_checked_announcements(&self) -> Option<DateTime<Utc>> {
        self.get_lenient(keys::ANNOUNCEMENTS_CHECKED_AT).await
    }

    /// Record that the visitor has seen every announcement up to `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn mark_announcements_checked(&self, at: DateTime<Utc>) -> SessionResult<()> {
        self.session
            .insert(keys::ANNOUNCEMENTS_CHECKED_AT, at)
            .await
    }

    /// Remember a Google sign-in until its callback arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn begin_google_sign_in(&self, pending: &PendingGoogleSignIn) -> SessionResult<()> {
        self.session.insert(keys::GOOGLE_SIGN_IN, pending).await
    }

    /// Take the pending Google sign-in. Each one can be completed once.
    pub async fn take_google_sign_in(&self) -> Option<PendingGoogleSignIn> {
        match self.session.remove::<PendingGoogleSignIn>(keys::GOOGLE_SIGN_IN).await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable Google sign-in state");
                None
            }
        }
    }

    async fn invalidate(&self) {
        *self.memo.write().await = None;
    }

    /// Read a key, treating store failures and undecodable values as absent.
    async fn get_lenient<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.session.get::<T>(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring unreadable session value");
                None
            }
        }
    }
}

/// Rejection when the session layer is missing from the stack.
pub struct MissingSession;

impl axum::response::IntoResponse for MissingSession {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "Session unavailable").into_response()
    }
}

impl<S> FromRequestParts<S> for SessionStore
where
    S: Send + Sync,
{
    type Rejection = MissingSession;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Share one store (and its memo) between extractors of the same request
        if let Some(store) = parts.extensions.get::<Self>() {
            return Ok(store.clone());
        }

        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(MissingSession)?;
        let store = Self::new(session);
        parts.extensions.insert(store.clone());
        Ok(store)
    }
}
