//! Client for the hosted identity provider (Identity Toolkit REST API).
//!
//! Handles email/password sign-up and sign-in, Google sign-in through
//! [`google`], and setting the display name and avatar of a new account.
//! Only the fields the forum needs are decoded.

pub mod google;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::IdentityConfig;

/// Errors that can occur when talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider rejected the request.
    #[error("Identity provider error: {raw}")]
    Provider { code: IdentityErrorCode, raw: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl IdentityError {
    /// Provider error code, when the provider gave one.
    #[must_use]
    pub const fn code(&self) -> Option<IdentityErrorCode> {
        match self {
            Self::Provider { code, .. } => Some(*code),
            Self::Http(_) | Self::Parse(_) => None,
        }
    }
}

/// Provider error codes the forum shows specific messages for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityErrorCode {
    EmailExists,
    EmailNotFound,
    InvalidPassword,
    InvalidCredentials,
    InvalidEmail,
    WeakPassword,
    TooManyAttempts,
    UserDisabled,
    Other,
}

impl IdentityErrorCode {
    /// Parse the provider's error message.
    ///
    /// Messages look like `EMAIL_EXISTS` or
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    #[must_use]
    pub fn parse(message: &str) -> Self {
        let code = message
            .split([' ', ':'])
            .next()
            .unwrap_or_default()
            .trim();
        match code {
            "EMAIL_EXISTS" => Self::EmailExists,
            "EMAIL_NOT_FOUND" => Self::EmailNotFound,
            "INVALID_PASSWORD" => Self::InvalidPassword,
            "INVALID_LOGIN_CREDENTIALS" => Self::InvalidCredentials,
            "INVALID_EMAIL" | "MISSING_EMAIL" => Self::InvalidEmail,
            "WEAK_PASSWORD" => Self::WeakPassword,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyAttempts,
            "USER_DISABLED" => Self::UserDisabled,
            _ => Self::Other,
        }
    }
}

/// Successful sign-up or sign-in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub id_token: String,
    /// Provider user id.
    pub local_id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Successful federated (Google) sign-in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpSession {
    pub id_token: String,
    /// Provider user id.
    pub local_id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Set when this sign-in created the account.
    #[serde(default)]
    pub is_new_user: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdateRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Identity provider client.
#[derive(Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl IdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Create an email/password account.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Provider`] when the provider refuses, e.g.
    /// because the email is taken.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        self.call(
            "accounts:signUp",
            &PasswordRequest {
                email,
                password,
                return_secure_token: true,
            },
        )
        .await
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Provider`] for wrong credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        self.call(
            "accounts:signInWithPassword",
            &PasswordRequest {
                email,
                password,
                return_secure_token: true,
            },
        )
        .await
    }

    /// Sign in (or sign up) with a Google ID token.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Provider`] when the provider rejects the
    /// token.
    #[instrument(skip(self, google_id_token))]
    pub async fn sign_in_with_idp(
        &self,
        google_id_token: &str,
        request_uri: &str,
    ) -> Result<IdpSession, IdentityError> {
        self.call(
            "accounts:signInWithIdp",
            &IdpRequest {
                post_body: format!(
                    "id_token={}&providerId=google.com",
                    urlencoding::encode(google_id_token)
                ),
                request_uri,
                return_secure_token: true,
                return_idp_credential: true,
            },
        )
        .await
    }

    /// Set the display name and avatar of the signed-in account.
    ///
    /// # Errors
    ///
    /// Returns error if the provider rejects the update.
    #[instrument(skip(self, id_token))]
    pub async fn update_profile(
        &self,
        id_token: &str,
        display_name: &str,
        photo_url: Option<&str>,
    ) -> Result<(), IdentityError> {
        let _: serde_json::Value = self
            .call(
                "accounts:update",
                &ProfileUpdateRequest {
                    id_token,
                    display_name,
                    photo_url,
                    return_secure_token: false,
                },
            )
            .await?;
        Ok(())
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, IdentityError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let url = format!(
            "{}/v1/{method}?key={}",
            self.base_url,
            urlencoding::encode(self.api_key.expose_secret())
        );

        // The key rides in the query string; keep it out of error messages
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let status = response.status();
        let text = response.text().await.map_err(reqwest::Error::without_url)?;

        if !status.is_success() {
            let raw = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("status {status}"));
            tracing::warn!(status = %status, message = %raw, "Identity provider refused request");
            return Err(IdentityError::Provider {
                code: IdentityErrorCode::parse(&raw),
                raw,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse identity provider response");
            IdentityError::Parse(e.to_string())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_code() {
        assert_eq!(
            IdentityErrorCode::parse("EMAIL_EXISTS"),
            IdentityErrorCode::EmailExists
        );
        assert_eq!(
            IdentityErrorCode::parse("INVALID_LOGIN_CREDENTIALS"),
            IdentityErrorCode::InvalidCredentials
        );
    }

    #[test]
    fn test_parse_code_with_detail() {
        assert_eq!(
            IdentityErrorCode::parse("WEAK_PASSWORD : Password should be at least 6 characters"),
            IdentityErrorCode::WeakPassword
        );
        assert_eq!(
            IdentityErrorCode::parse("TOO_MANY_ATTEMPTS_TRY_LATER:Access disabled"),
            IdentityErrorCode::TooManyAttempts
        );
    }

    #[test]
    fn test_parse_unknown_code() {
        assert_eq!(
            IdentityErrorCode::parse("OPERATION_NOT_ALLOWED"),
            IdentityErrorCode::Other
        );
        assert_eq!(IdentityErrorCode::parse(""), IdentityErrorCode::Other);
    }

    #[test]
    fn test_auth_session_decodes_camel_case() {
        let session: AuthSession = serde_json::from_str(
            r#"{"idToken":"t","localId":"uid-1","email":"a@b.com","refreshToken":"r"}"#,
        )
        .unwrap();
        assert_eq!(session.local_id, "uid-1");
        assert!(session.display_name.is_none());
    }

    #[test]
    fn test_idp_request_shape() {
        let body = serde_json::to_value(IdpRequest {
            post_body: "id_token=abc&providerId=google.com".to_string(),
            request_uri: "http://localhost:3000/auth/google/callback",
            return_secure_token: true,
            return_idp_credential: true,
        })
        .unwrap();
        assert_eq!(body["postBody"], "id_token=abc&providerId=google.com");
        assert_eq!(body["requestUri"], "http://localhost:3000/auth/google/callback");
        assert_eq!(body["returnSecureToken"], true);
    }

    #[test]
    fn test_idp_session_defaults_new_user_flag() {
        let session: IdpSession = serde_json::from_str(
            r#"{"idToken":"t","localId":"g-1","email":"g@b.com","displayName":"Gina"}"#,
        )
        .unwrap();
        assert!(!session.is_new_user);
        assert_eq!(session.display_name.as_deref(), Some("Gina"));
    }

    #[tokio::test]
    async fn test_transport_errors_do_not_leak_api_key() {
        // Reserve a port, then close it so the connection is refused
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let key = "AIzaSyD3mK9qLw2Xv7bN1pR4tY6uH8jZ0cF5gE";
        let client = IdentityClient::new(&IdentityConfig {
            base_url: format!("http://{addr}"),
            api_key: SecretString::from(key),
            timeout: std::time::Duration::from_secs(5),
        })
        .unwrap();

        let err = client.sign_in("a@b.com", "Abc123").await.unwrap_err();
        assert!(matches!(err, IdentityError::Http(_)));
        assert!(!err.to_string().contains(key));
        assert!(!format!("{err:?}").contains(key));
    }

    #[test]
    fn test_profile_update_omits_missing_photo() {
        let body = serde_json::to_value(ProfileUpdateRequest {
            id_token: "t",
            display_name: "Ann",
            photo_url: None,
            return_secure_token: false,
        })
        .unwrap();
        assert_eq!(body["displayName"], "Ann");
        assert!(body.get("photoUrl").is_none());
    }
}
