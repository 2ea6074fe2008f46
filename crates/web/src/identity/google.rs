//! Google OAuth (authorization code flow) for "Continue with Google".
//!
//! The visitor is sent to Google's consent page with a random `state` kept
//! in the session. Google redirects back with a code, which is exchanged
//! here for a Google ID token. That token is then handed to the identity
//! provider (`accounts:signInWithIdp`), which creates or signs in the
//! matching account.

use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use super::{IdentityError, IdentityErrorCode};
use crate::config::GoogleConfig;

const SCOPES: &str = "openid email profile";

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Deserialize)]
struct TokenError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuth {
    client: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleOAuth {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &GoogleConfig, timeout: std::time::Duration) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Consent page URL for this sign-in attempt.
    #[must_use]
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&prompt=select_account",
            self.config.authorize_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for a Google ID token.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Provider`] when Google refuses the code and
    /// [`IdentityError::Parse`] when no ID token comes back.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, IdentityError> {
        let form = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let raw = serde_json::from_str::<TokenError>(&text).map_or_else(
                |_| format!("status {status}"),
                |e| match e.error_description {
                    Some(description) => format!("{}: {description}", e.error),
                    None => e.error,
                },
            );
            tracing::warn!(status = %status, message = %raw, "Google refused the authorization code");
            return Err(IdentityError::Provider {
                code: IdentityErrorCode::Other,
                raw,
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&text).map_err(|e| IdentityError::Parse(e.to_string()))?;
        token
            .id_token
            .ok_or_else(|| IdentityError::Parse("token response has no id_token".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn client() -> GoogleOAuth {
        GoogleOAuth::new(
            &GoogleConfig {
                client_id: "1234.apps.googleusercontent.com".to_string(),
                client_secret: SecretString::from("GOCSPX-q8Zr2kVw7nTb4Lm1"),
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
            },
            std::time::Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_authorization_url_carries_state_and_callback() {
        let url = client().authorization_url("http://localhost:3000/auth/google/callback", "abc123");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?client_id=1234.apps.googleusercontent.com"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("state=abc123"));
        assert!(!url.contains("GOCSPX"));
    }
}
