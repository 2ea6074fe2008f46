//! Client for the remote VibeHive forum API.
//!
//! # Architecture
//!
//! - The API is the source of truth - NO local persistence, direct calls only
//! - Every list endpoint is decoded through [`vibehive_core::envelope::parse_list`]
//! - Tags and forum stats are cached in memory via `moka` (60 second TTL)
//!
//! # Example
//!
//! ```rust,ignore
//! use vibehive_web::api::ApiClient;
//!
//! let api = ApiClient::new(&config.api)?;
//!
//! let posts = api.list_posts().await?;
//! let post = api.vote(&posts[0].id, &VoteRequest { vote_type: VoteType::Up, user_email }).await?;
//! ```

mod cache;
mod client;

pub use client::ApiClient;

use thiserror::Error;
use vibehive_core::envelope::EnvelopeError;

/// Errors that can occur when talking to the forum API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Response body was not valid JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Response JSON did not have the expected shape.
    #[error("Unexpected response shape: {0}")]
    Shape(#[from] EnvelopeError),
}

impl ApiError {
    /// Whether the API reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    /// Message suitable for showing to the user.
    ///
    /// Server-provided messages are passed through for non-success statuses;
    /// transport and decoding details are not.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } if !message.is_empty() => message.clone(),
            Self::Status { status, .. } => format!("Server error ({status})"),
            Self::Http(_) => "Network error. Please check your connection and try again.".to_string(),
            Self::Parse(_) | Self::Shape(_) => "Unexpected response from the server.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err = ApiError::Status {
            status: 404,
            message: String::new(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.user_message(), "Server error (404)");
    }

    #[test]
    fn test_user_message_passes_server_message() {
        let err = ApiError::Status {
            status: 400,
            message: "Email is required".to_string(),
        };
        assert!(!err.is_not_found());
        assert_eq!(err.user_message(), "Email is required");
    }
}
