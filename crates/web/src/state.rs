//! Application state shared across handlers.

use std::sync::{Arc, OnceLock};

use tokio::task::AbortHandle;
use tower_sessions::MemoryStore;

use crate::api::{ApiClient, ApiError};
use crate::config::WebConfig;
use crate::identity::google::GoogleOAuth;
use crate::identity::{IdentityClient, IdentityError};
use crate::services::notifications::NotificationFeed;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("forum API client: {0}")]
    Api(#[from] ApiError),
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    api: ApiClient,
    identity: IdentityClient,
    google: Option<GoogleOAuth>,
    sessions: MemoryStore,
    notifications: NotificationFeed,
    poller: OnceLock<AbortHandle>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: WebConfig) -> Result<Self, StateError> {
        let api = ApiClient::new(&config.api)?;
        let identity = IdentityClient::new(&config.identity)?;
        let google = config
            .google
            .as_ref()
            .map(|google| GoogleOAuth::new(google, config.identity.timeout))
            .transpose()?;
        let notifications = NotificationFeed::new(api.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                identity,
                google,
                sessions: MemoryStore::default(),
                notifications,
                poller: OnceLock::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Remote forum API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Identity provider client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Google sign-in client, when configured.
    #[must_use]
    pub fn google(&self) -> Option<&GoogleOAuth> {
        self.inner.google.as_ref()
    }

    /// Backing store of the session layer.
    #[must_use]
    pub fn sessions(&self) -> &MemoryStore {
        &self.inner.sessions
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationFeed {
        &self.inner.notifications
    }

    /// Start the announcement poller. Later calls are no-ops.
    pub fn start_notification_polling(&self) {
        if self.inner.poller.get().is_some() {
            return;
        }
        let handle = self
            .notifications()
            .spawn_poller(self.config().announcement_poll_interval);
        if self.inner.poller.set(handle.abort_handle()).is_err() {
            handle.abort();
        }
    }

    /// Stop the announcement poller, if it was started.
    pub fn stop_notification_polling(&self) {
        if let Some(handle) = self.inner.poller.get() {
            handle.abort();
        }
    }
}
