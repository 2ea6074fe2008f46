//! Web front end configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VIBEHIVE_BASE_URL` - Public URL of this front end
//! - `VIBEHIVE_API_URL` - Base URL of the remote forum API
//! - `FIREBASE_API_KEY` - Identity Toolkit web API key
//!
//! ## Optional
//! - `VIBEHIVE_HOST` - Bind address (default: 127.0.0.1)
//! - `VIBEHIVE_PORT` - Listen port (default: 3000)
//! - `VIBEHIVE_STATIC_DIR` - Static asset directory (default: crates/web/static)
//! - `VIBEHIVE_HTTP_TIMEOUT_SECONDS` - Timeout for remote calls (default: 10)
//! - `VIBEHIVE_ANNOUNCEMENT_POLL_SECONDS` - Announcement refresh interval (default: 60)
//! - `VIBEHIVE_ADMIN_FALLBACK_EMAILS` - Comma-separated admins accepted while the
//!   admin check endpoint is unreachable (default: none)
//! - `VIBEHIVE_LOG_JSON` - Emit JSON logs when set to `1` or `true`
//! - `IDENTITY_TOOLKIT_URL` - Identity provider base URL, e.g. an emulator
//!   (default: <https://identitytoolkit.googleapis.com>)
//! - `GOOGLE_CLIENT_ID` - OAuth client id; enables "Continue with Google"
//! - `GOOGLE_CLIENT_SECRET` - OAuth client secret (required with the client id)
//! - `GOOGLE_AUTHORIZE_URL` - Consent page (default: Google's)
//! - `GOOGLE_TOKEN_URL` - Code exchange endpoint (default: Google's)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0-1.0 (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use vibehive_core::guard::AdminAllowList;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default Identity Toolkit endpoint.
pub const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";

/// Default Google OAuth endpoints.
pub const DEFAULT_GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Web front end configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the front end
    pub base_url: String,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Remote forum API
    pub api: ApiConfig,
    /// Identity provider
    pub identity: IdentityConfig,
    /// Google sign-in, when configured
    pub google: Option<GoogleConfig>,
    /// Admins accepted when the admin check endpoint cannot be reached
    pub admin_fallback: AdminAllowList,
    /// How often the announcement feed is refreshed
    pub announcement_poll_interval: Duration,
    /// Emit JSON formatted logs
    pub log_json: bool,
    /// Error tracking
    pub sentry: SentryConfig,
}

/// Remote forum API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Identity provider configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Identity Toolkit base URL without trailing slash
    pub base_url: String,
    /// Web API key sent as the `key` query parameter
    pub api_key: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Google OAuth client used for "Continue with Google".
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub authorize_url: String,
    pub token_url: String,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// Sentry configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("VIBEHIVE_HOST", "127.0.0.1")?;
        let port = parse_env("VIBEHIVE_PORT", "3000")?;
        let base_url = get_url("VIBEHIVE_BASE_URL", None)?;
        let static_dir = PathBuf::from(get_env_or_default(
            "VIBEHIVE_STATIC_DIR",
            "crates/web/static",
        ));
        let timeout = Duration::from_secs(parse_env("VIBEHIVE_HTTP_TIMEOUT_SECONDS", "10")?);
        let poll_seconds: u64 = parse_env("VIBEHIVE_ANNOUNCEMENT_POLL_SECONDS", "60")?;
        if poll_seconds == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "VIBEHIVE_ANNOUNCEMENT_POLL_SECONDS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let api = ApiConfig {
            base_url: get_url("VIBEHIVE_API_URL", None)?,
            timeout,
        };
        let identity = IdentityConfig {
            base_url: get_url("IDENTITY_TOOLKIT_URL", Some(DEFAULT_IDENTITY_TOOLKIT_URL))?,
            api_key: get_validated_secret("FIREBASE_API_KEY")?,
            timeout,
        };
        let google = match get_optional_env("GOOGLE_CLIENT_ID") {
            Some(client_id) => Some(GoogleConfig {
                client_id,
                client_secret: get_validated_secret("GOOGLE_CLIENT_SECRET")?,
                authorize_url: get_url("GOOGLE_AUTHORIZE_URL", Some(DEFAULT_GOOGLE_AUTHORIZE_URL))?,
                token_url: get_url("GOOGLE_TOKEN_URL", Some(DEFAULT_GOOGLE_TOKEN_URL))?,
            }),
            None => None,
        };
        let admin_fallback = AdminAllowList::parse(&get_env_or_default(
            "VIBEHIVE_ADMIN_FALLBACK_EMAILS",
            "",
        ));
        let log_json = matches!(
            get_optional_env("VIBEHIVE_LOG_JSON").as_deref(),
            Some("1" | "true")
        );

        let sentry = SentryConfig {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_sample_rate("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_sample_rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        };

        Ok(Self {
            host,
            port,
            base_url,
            static_dir,
            api,
            identity,
            google,
            admin_fallback,
            announcement_poll_interval: Duration::from_secs(poll_seconds),
            log_json,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a Sentry sample rate and check it is within 0.0-1.0.
fn parse_sample_rate(key: &str, default: &str) -> Result<f32, ConfigError> {
    let rate: f32 = parse_env(key, default)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("{rate} is outside 0.0-1.0"),
        ))
    }
}

/// Get an absolute http(s) URL, normalized without a trailing slash.
fn get_url(key: &str, default: Option<&str>) -> Result<String, ConfigError> {
    let raw = match (std::env::var(key), default) {
        (Ok(value), _) => value,
        (Err(_), Some(default)) => default.to_string(),
        (Err(_), None) => return Err(ConfigError::MissingEnvVar(key.to_string())),
    };
    normalize_url(&raw).map_err(|reason| ConfigError::InvalidEnvVar(key.to_string(), reason))
}

fn normalize_url(raw: &str) -> Result<String, String> {
    let parsed = url::Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", parsed.scheme()));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the project settings."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
