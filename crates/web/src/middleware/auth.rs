//! Authentication extractors.
//!
//! - [`OptionalUser`]: the resolved current user, if any. Never rejects.
//! - [`RequireUser`]: any signed-in user with an email.
//! - [`RequireAdmin`]: an admin, confirmed locally or by the forum API.
//!
//! Unauthorized page requests are redirected to `/login` carrying the path
//! they came from, so the login flow can send the visitor back. Fragment
//! requests from the page script get a bare 401 instead.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{Method, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use vibehive_core::guard::{
    Access, AdminDecision, AdminDenial, AdminPrecheck, RemoteAdminCheck, admin_precheck,
    admin_remote_outcome, private_route,
};
use vibehive_core::models::AdminCheck;
use vibehive_core::session::{AdminProfile, CurrentUser};

use crate::notice::Notice;
use crate::session::SessionStore;
use crate::state::AppState;
use crate::views::is_htmx;

/// Extractor that optionally gets the current user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalUser(user): OptionalUser) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Hello, {}!", u.name),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = match SessionStore::from_request_parts(parts, state).await {
            Ok(store) => store.current_user().await,
            Err(_) => None,
        };
        Ok(Self(user))
    }
}

/// Extractor that requires a signed-in user.
pub struct RequireUser(pub CurrentUser);

/// Extractor that requires an admin.
pub struct RequireAdmin(pub CurrentUser);

/// Rejection from the auth extractors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// Send the visitor to the login page.
    RedirectToLogin {
        redirect: String,
        admin_required: bool,
        notice: Option<Notice>,
    },
    /// Bare 401 for fragment requests.
    Unauthorized,
}

impl AuthRejection {
    fn for_request(parts: &Parts, admin_required: bool, notice: Option<Notice>) -> Self {
        if is_htmx(&parts.headers) {
            return Self::Unauthorized;
        }

        // Only GET targets can be revisited after login
        let redirect = if parts.method == Method::GET {
            parts
                .uri
                .path_and_query()
                .map_or("/", |pq| pq.as_str())
                .to_string()
        } else {
            "/".to_string()
        };

        Self::RedirectToLogin {
            redirect,
            admin_required,
            notice,
        }
    }

    /// Login URL for a redirect rejection.
    #[must_use]
    pub fn login_url(redirect: &str, admin_required: bool, notice: Option<Notice>) -> String {
        let mut url = format!("/login?redirect={}", urlencoding::encode(redirect));
        if admin_required {
            url.push_str("&admin_required=true");
        }
        match notice {
            Some(notice) => notice.append_to(&url),
            None => url,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin {
                redirect,
                admin_required,
                notice,
            } => Redirect::to(&Self::login_url(&redirect, admin_required, notice)).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let OptionalUser(user) = OptionalUser::from_request_parts(parts, state)
            .await
            .unwrap_or(OptionalUser(None));

        match (private_route(user.as_ref()), user) {
            (Access::Authorized, Some(user)) => Ok(Self(user)),
            _ => Err(AuthRejection::for_request(
                parts,
                false,
                Some(Notice::LoginRequired),
            )),
        }
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let deny = |parts: &Parts, notice: Notice| {
            tracing::info!(path = %parts.uri.path(), reason = notice.code(), "Admin access denied");
            AuthRejection::for_request(parts, true, Some(notice))
        };

        let Ok(store) = SessionStore::from_request_parts(parts, state).await else {
            return Err(deny(parts, Notice::AdminRequired));
        };
        let user = store.current_user().await;
        let (admin_email, admin_profile) = store.admin_marker().await;

        let email = match admin_precheck(
            user.as_ref(),
            admin_email.as_deref(),
            admin_profile.as_deref(),
        ) {
            AdminPrecheck::Granted => {
                return user
                    .map(Self)
                    .ok_or_else(|| deny(parts, Notice::AdminRequired));
            }
            AdminPrecheck::Denied => return Err(deny(parts, Notice::AdminRequired)),
            AdminPrecheck::VerifyRemotely(email) => email,
        };

        let (check, confirmed) = match state.api().check_admin(&email).await {
            Ok(check) if check.is_admin => (RemoteAdminCheck::Confirmed, Some(check)),
            Ok(_) => (RemoteAdminCheck::Rejected, None),
            Err(e) => {
                tracing::warn!(error = %e, "Admin check failed");
                (RemoteAdminCheck::Unavailable, None)
            }
        };

        match admin_remote_outcome(&email, check, &state.config().admin_fallback) {
            AdminDecision::Granted => {
                let profile = confirmed.map_or_else(
                    || fallback_profile(admin_profile.as_deref()),
                    AdminProfile::from,
                );
                // Only a positive answer from the API is remembered
                if check == RemoteAdminCheck::Confirmed
                    && let Err(e) = store.set_admin_marker(&email, &profile).await
                {
                    tracing::warn!(error = %e, "Failed to cache admin profile");
                }
                Ok(Self(CurrentUser::admin(&email, profile)))
            }
            AdminDecision::Denied(AdminDenial::Rejected) => {
                if let Err(e) = store.clear_admin_marker().await {
                    tracing::warn!(error = %e, "Failed to clear admin marker");
                }
                Err(deny(parts, Notice::NotAdmin))
            }
            AdminDecision::Denied(AdminDenial::VerificationFailed) => {
                Err(deny(parts, Notice::AdminVerifyFailed))
            }
        }
    }
}

fn fallback_profile(blob: Option<&str>) -> AdminProfile {
    let profile = blob.and_then(AdminProfile::parse).unwrap_or_default();
    AdminProfile::from(AdminCheck {
        is_admin: true,
        name: profile.name,
        email: profile.email,
        photo: profile.photo,
        role: None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(method: Method, uri: &str) -> Parts {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_login_url_carries_path() {
        assert_eq!(
            AuthRejection::login_url("/my-posts?page=2", false, None),
            "/login?redirect=%2Fmy-posts%3Fpage%3D2"
        );
        assert_eq!(
            AuthRejection::login_url("/admin", true, Some(Notice::AdminRequired)),
            "/login?redirect=%2Fadmin&admin_required=true&error=admin_required"
        );
    }

    #[test]
    fn test_get_request_keeps_original_path() {
        let rejection = AuthRejection::for_request(&parts(Method::GET, "/add-post"), false, None);
        assert_eq!(
            rejection,
            AuthRejection::RedirectToLogin {
                redirect: "/add-post".to_string(),
                admin_required: false,
                notice: None,
            }
        );
    }

    #[test]
    fn test_post_request_returns_home() {
        let rejection = AuthRejection::for_request(&parts(Method::POST, "/add-post"), false, None);
        assert!(matches!(
            rejection,
            AuthRejection::RedirectToLogin { redirect, .. } if redirect == "/"
        ));
    }

    #[test]
    fn test_fragment_requests_get_401() {
        let mut parts = parts(Method::POST, "/notifications/read");
        parts
            .headers
            .insert("HX-Request", axum::http::HeaderValue::from_static("true"));
        let rejection = AuthRejection::for_request(&parts, false, None);
        assert_eq!(rejection, AuthRejection::Unauthorized);
        assert_eq!(
            rejection.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_redirect_is_see_other() {
        let response = AuthRejection::RedirectToLogin {
            redirect: "/".to_string(),
            admin_required: false,
            notice: None,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[test]
    fn test_fallback_profile_keeps_cached_name() {
        let profile = fallback_profile(Some(r#"{"name":"Boss"}"#));
        assert_eq!(profile.name.as_deref(), Some("Boss"));
        assert!(profile.role.is_some_and(vibehive_core::Role::is_admin));
        assert_eq!(fallback_profile(Some("{bad")).name, None);
    }
}
