//! Authentication route handlers.
//!
//! Handles login, registration, Google sign-in and logout. Credentials are
//! checked by the identity provider; see [`crate::services::auth`] for the
//! flows.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::filters;
use crate::notice::Notice;
use crate::services::FieldErrors;
use crate::services::auth::{self, AuthError, LoginInput, RegisterInput};
use crate::session::{PendingGoogleSignIn, SessionStore};
use crate::state::AppState;
use crate::views::{PageContext, safe_return_path};

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Checkbox; present when ticked.
    pub admin: Option<String>,
    pub redirect: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub photo_url: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub redirect: Option<String>,
    pub admin_required: Option<bool>,
}

/// Query parameters for starting a Google sign-in.
#[derive(Debug, Default, Deserialize)]
pub struct GoogleStartQuery {
    pub redirect: Option<String>,
}

/// Query parameters Google sends back to the callback.
#[derive(Debug, Default, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the visitor declined or Google failed.
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub redirect: String,
    pub admin_required: bool,
    pub email: String,
    pub errors: FieldErrors,
    /// "Continue with Google" link, when Google sign-in is configured.
    pub google_href: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub name: String,
    pub email: String,
    pub photo_url: String,
    pub errors: FieldErrors,
    pub google_href: Option<String>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Start link for Google sign-in, if it is configured.
fn google_href(state: &AppState, redirect: &str) -> Option<String> {
    state
        .google()
        .map(|_| format!("/auth/google?redirect={}", urlencoding::encode(redirect)))
}

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<LoginQuery>,
) -> Response {
    let redirect = safe_return_path(query.redirect.as_deref());
    if ctx.signed_in() && !query.admin_required.unwrap_or(false) {
        return Redirect::to(&redirect).into_response();
    }

    LoginTemplate {
        ctx,
        google_href: google_href(&state, &redirect),
        redirect,
        admin_required: query.admin_required.unwrap_or(false),
        email: String::new(),
        errors: FieldErrors::new(),
    }
    .into_response()
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    store: SessionStore,
    ctx: PageContext,
    Form(form): Form<LoginForm>,
) -> Response {
    let redirect = safe_return_path(form.redirect.as_deref());
    let input = LoginInput {
        email: form.email,
        password: form.password,
        admin: form.admin.is_some(),
    };

    match auth::login(&state, &store, &input).await {
        Ok(()) => Redirect::to(&Notice::LoggedIn.append_to(&redirect)).into_response(),
        Err(AuthError::Invalid(errors)) => LoginTemplate {
            ctx,
            google_href: google_href(&state, &redirect),
            redirect,
            admin_required: input.admin,
            email: input.email,
            errors,
        }
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            let target = login_target(&redirect, input.admin);
            Redirect::to(&e.notice(Notice::LoginFailed).append_to(&target)).into_response()
        }
    }
}

fn login_target(redirect: &str, admin: bool) -> String {
    let mut target = format!("/login?redirect={}", urlencoding::encode(redirect));
    if admin {
        target.push_str("&admin_required=true");
    }
    target
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(State(state): State<AppState>, ctx: PageContext) -> Response {
    if ctx.signed_in() {
        return Redirect::to("/").into_response();
    }

    RegisterTemplate {
        ctx,
        name: String::new(),
        email: String::new(),
        photo_url: String::new(),
        errors: FieldErrors::new(),
        google_href: google_href(&state, "/"),
    }
    .into_response()
}

/// Handle registration form submission.
pub async fn register(
    State(state): State<AppState>,
    store: SessionStore,
    ctx: PageContext,
    Form(form): Form<RegisterForm>,
) -> Response {
    let input = RegisterInput {
        name: form.name,
        email: form.email,
        photo_url: form.photo_url,
        password: form.password,
        confirm_password: form.confirm_password,
    };

    match auth::register(&state, &store, &input).await {
        Ok(registered) if registered.user_synced => {
            Redirect::to(&Notice::Registered.append_to("/")).into_response()
        }
        Ok(_) => Redirect::to(&Notice::UserSyncFailed.append_to("/")).into_response(),
        Err(AuthError::Invalid(errors)) => RegisterTemplate {
            ctx,
            name: input.name,
            email: input.email,
            photo_url: input.photo_url.unwrap_or_default(),
            errors,
            google_href: google_href(&state, "/"),
        }
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            Redirect::to(&e.notice(Notice::RegistrationFailed).append_to("/register"))
                .into_response()
        }
    }
}

// =============================================================================
// Google Sign-In
// =============================================================================

fn google_callback_uri(state: &AppState) -> String {
    format!("{}/auth/google/callback", state.config().base_url)
}

/// Send the visitor to Google's consent page.
///
/// # Route
///
/// `GET /auth/google`
pub async fn google_start(
    State(state): State<AppState>,
    store: SessionStore,
    Query(query): Query<GoogleStartQuery>,
) -> Response {
    let Some(google) = state.google() else {
        return Redirect::to(&Notice::GoogleUnavailable.append_to("/login")).into_response();
    };

    let pending = PendingGoogleSignIn {
        state: Uuid::new_v4().simple().to_string(),
        redirect: safe_return_path(query.redirect.as_deref()),
    };
    if let Err(e) = store.begin_google_sign_in(&pending).await {
        tracing::error!(error = %e, "Failed to store Google sign-in state");
        return Redirect::to(&Notice::SessionError.append_to("/login")).into_response();
    }

    Redirect::to(&google.authorization_url(&google_callback_uri(&state), &pending.state))
        .into_response()
}

/// Handle Google's redirect back after consent.
///
/// # Route
///
/// `GET /auth/google/callback`
pub async fn google_callback(
    State(state): State<AppState>,
    store: SessionStore,
    Query(query): Query<GoogleCallbackQuery>,
) -> Response {
    let pending = store.take_google_sign_in().await;
    let failed = |notice: Notice| Redirect::to(&notice.append_to("/login")).into_response();

    if let Some(error) = query.error {
        tracing::info!(error = %error, "Google sign-in not completed");
        return failed(if error == "access_denied" {
            Notice::GoogleCancelled
        } else {
            Notice::GoogleFailed
        });
    }

    let (Some(code), Some(returned_state)) = (query.code, query.state) else {
        tracing::warn!("Google callback missing code or state");
        return failed(Notice::GoogleFailed);
    };
    let Some(pending) = pending.filter(|pending| pending.state == returned_state) else {
        tracing::warn!("Google sign-in state mismatch");
        return failed(Notice::GoogleFailed);
    };

    match auth::google_sign_in(&state, &store, &code, &google_callback_uri(&state)).await {
        Ok(signed_in) if signed_in.user_synced => {
            Redirect::to(&Notice::GoogleSignedIn.append_to(&pending.redirect)).into_response()
        }
        Ok(_) => {
            Redirect::to(&Notice::GoogleSyncFailed.append_to(&pending.redirect)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Google sign-in failed");
            failed(e.notice(Notice::GoogleFailed))
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
pub async fn logout(store: SessionStore) -> impl IntoResponse {
    if let Err(e) = auth::logout(&store).await {
        tracing::error!(error = %e, "Failed to clear session");
        return Redirect::to(&Notice::SessionError.append_to("/"));
    }
    Redirect::to(&Notice::LoggedOut.append_to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_target_keeps_admin_mode() {
        assert_eq!(login_target("/", false), "/login?redirect=%2F");
        assert_eq!(
            login_target("/admin", true),
            "/login?redirect=%2Fadmin&admin_required=true"
        );
    }
}
