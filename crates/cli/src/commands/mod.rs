//! Command implementations.

pub mod admin;
pub mod forum;

use std::time::Duration;

use thiserror::Error;
use vibehive_web::api::{ApiClient, ApiError};
use vibehive_web::config::ApiConfig;
use vibehive_web::services::admin::AdminError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required setting is missing.
    #[error("Missing API URL: pass --api-url or set VIBEHIVE_API_URL")]
    MissingApiUrl,

    /// Input rejected before anything was sent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Forum API error.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Admin action error.
    #[error(transparent)]
    Admin(#[from] AdminError),
}

/// Build a forum API client.
///
/// # Errors
///
/// Returns [`CommandError::MissingApiUrl`] without a URL, or the client
/// build error.
pub fn api_client(api_url: Option<&str>, timeout_seconds: u64) -> Result<ApiClient, CommandError> {
    let base_url = api_url
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or(CommandError::MissingApiUrl)?;

    tracing::debug!("Using forum API at {base_url}");
    Ok(ApiClient::new(&ApiConfig {
        base_url: base_url.to_owned(),
        timeout: Duration::from_secs(timeout_seconds),
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_client_requires_url() {
        assert!(matches!(
            api_client(None, 10),
            Err(CommandError::MissingApiUrl)
        ));
        assert!(matches!(
            api_client(Some("  "), 10),
            Err(CommandError::MissingApiUrl)
        ));
        assert!(api_client(Some("http://127.0.0.1:5000"), 10).is_ok());
    }
}
