//! End-to-end flows through the real router, against fake remote services.
//!
//! Run with: cargo test -p vibehive-integration-tests

#![allow(clippy::indexing_slicing)]

use axum::http::Method;
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde_json::json;
use vibehive_core::guard::AdminAllowList;
use vibehive_integration_tests::{TestApp, location};

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;

    let resp = app.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("body"), "ok");

    let resp = app.get("/health/ready").await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_home_renders_for_visitors() {
    let app = TestApp::spawn().await;
    app.forum.add_post("writer@example.com", "Hello hive", Utc::now());

    let resp = app.get("/").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"))
    );
    let body = resp.text().await.expect("body");
    assert!(body.contains("Hello hive"));
}

// ============================================================================
// Registration & Login
// ============================================================================

#[tokio::test]
async fn test_register_syncs_forum_user_and_signs_in() {
    let app = TestApp::spawn().await;

    let resp = app
        .post_form(
            "/register",
            &[
                ("name", "Ann"),
                ("email", "a@b.com"),
                ("photo_url", ""),
                ("password", "Abc123"),
                ("confirm_password", "Abc123"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/?success=registered");

    let uid = app.identity.uid_of("a@b.com").expect("account created");
    let created = app.forum.requests_to(&Method::POST, "/users");
    let record = created
        .iter()
        .find(|r| r.path == "/users")
        .expect("forum user record created");
    assert_eq!(record.body["email"], "a@b.com");
    assert_eq!(record.body["uid"], uid.as_str());
    assert_eq!(record.body["name"], "Ann");

    // Registration leaves the visitor signed in
    let resp = app.get("/my-posts").await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_registration_sends_nothing() {
    let app = TestApp::spawn().await;

    let resp = app
        .post_form(
            "/register",
            &[
                ("name", "Ann"),
                ("email", "a@b.com"),
                ("password", "abc"),
                ("confirm_password", "abd"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(app.identity.requests().is_empty());
    assert!(app.forum.requests_to(&Method::POST, "/users").is_empty());
}

#[tokio::test]
async fn test_login_and_wrong_password() {
    let app = TestApp::spawn().await;
    app.identity.add_account("ann@example.com", "Abc123");
    app.forum.add_user("ann@example.com", "Ann", false);

    let resp = app.sign_in("ann@example.com", "Wrong1", false).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).contains("error=invalid_credentials"));

    let resp = app.sign_in("ann@example.com", "Abc123", false).await;
    assert_eq!(location(&resp), "/?success=logged_in");

    let body = app.get("/").await.text().await.expect("body");
    assert!(body.contains("Ann"));
}

#[tokio::test]
async fn test_registered_user_signs_back_in_as_plain_user() {
    let app = TestApp::spawn().await;

    let resp = app
        .post_form(
            "/register",
            &[
                ("name", "Ann"),
                ("email", "a@b.com"),
                ("photo_url", ""),
                ("password", "Abc123"),
                ("confirm_password", "Abc123"),
            ],
        )
        .await;
    assert_eq!(location(&resp), "/?success=registered");

    let resp = app.post_form("/logout", &[]).await;
    assert_eq!(location(&resp), "/?success=logged_out");
    assert_eq!(app.get("/my-posts").await.status(), StatusCode::SEE_OTHER);

    let resp = app.sign_in("a@b.com", "Abc123", false).await;
    assert_eq!(location(&resp), "/?success=logged_in");

    let session = app.session_data().await;
    assert_eq!(session["identity"]["email"], "a@b.com");
    assert_eq!(session["identity"]["role"], "user");
    assert!(!session.contains_key("admin_email"));

    assert_eq!(app.get("/my-posts").await.status(), StatusCode::OK);
    let resp = app.get("/admin").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).contains("admin_required=true"));
}

#[tokio::test]
async fn test_plain_login_replaces_previous_admin_session() {
    let app = TestApp::spawn().await;
    app.identity.add_account("boss@example.com", "Abc123");
    app.forum.add_user("boss@example.com", "Boss", true);
    app.identity.add_account("ann@example.com", "Abc123");
    app.forum.add_user("ann@example.com", "Ann", false);

    let resp = app.sign_in("boss@example.com", "Abc123", true).await;
    assert_eq!(location(&resp), "/?success=logged_in");
    assert_eq!(app.get("/admin").await.status(), StatusCode::OK);

    // Same browser, no logout in between
    let resp = app.sign_in("ann@example.com", "Abc123", false).await;
    assert_eq!(location(&resp), "/?success=logged_in");

    let resp = app.get("/admin").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).contains("admin_required=true"));

    let body = app.get("/").await.text().await.expect("body");
    assert!(body.contains("Ann"));
    assert!(!body.contains("Boss"));

    let session = app.session_data().await;
    assert!(!session.contains_key("admin_email"));
    assert!(!session.contains_key("admin_profile"));
}

// ============================================================================
// Google sign-in
// ============================================================================

/// Follow `/auth/google` and return the `state` Google would echo back.
async fn start_google_sign_in(app: &TestApp, redirect: &str) -> String {
    let resp = app
        .get(&format!("/auth/google?redirect={}", urlencoding::encode(redirect)))
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let consent = reqwest::Url::parse(&location(&resp)).expect("absolute consent URL");
    assert_eq!(consent.path(), "/authorize");

    let query: std::collections::HashMap<_, _> = consent.query_pairs().into_owned().collect();
    assert_eq!(query["response_type"], "code");
    assert_eq!(query["client_id"], "test-client.apps.googleusercontent.com");
    assert_eq!(query["redirect_uri"], app.url("/auth/google/callback"));
    query["state"].clone()
}

#[tokio::test]
async fn test_google_sign_in_creates_forum_user() {
    let app = TestApp::spawn().await;
    app.identity.add_google_code("code-1", "gina@example.com", "Gina");

    let login = app.get("/login").await.text().await.expect("body");
    assert!(login.contains("Continue with Google"));

    let state = start_google_sign_in(&app, "/my-posts").await;
    let resp = app
        .get(&format!("/auth/google/callback?code=code-1&state={state}"))
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/my-posts?success=google_signed_in");

    let token = app
        .identity
        .requests()
        .into_iter()
        .find(|r| r.path == "/token")
        .expect("code exchanged");
    assert_eq!(token.body["code"], "code-1");
    assert_eq!(token.body["redirect_uri"], app.url("/auth/google/callback"));

    let created = app.forum.requests_to(&Method::POST, "/users");
    let record = created
        .iter()
        .find(|r| r.path == "/users")
        .expect("forum user record created");
    assert_eq!(record.body["email"], "gina@example.com");
    assert_eq!(record.body["name"], "Gina");
    assert_eq!(record.body["provider"], "google");

    assert_eq!(app.get("/my-posts").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_google_sign_in_for_returning_user_skips_record_creation() {
    let app = TestApp::spawn().await;
    app.identity.add_account("gina@example.com", "Abc123");
    app.forum.add_user("gina@example.com", "Gina", false);
    app.identity.add_google_code("code-2", "gina@example.com", "Gina G");

    let state = start_google_sign_in(&app, "/").await;
    let resp = app
        .get(&format!("/auth/google/callback?code=code-2&state={state}"))
        .await;
    assert_eq!(location(&resp), "/?success=google_signed_in");
    assert!(
        app.forum
            .requests_to(&Method::POST, "/users")
            .iter()
            .all(|r| r.path != "/users")
    );

    let body = app.get("/").await.text().await.expect("body");
    assert!(body.contains("Gina"));
}

#[tokio::test]
async fn test_google_callback_rejects_forged_state_and_cancellation() {
    let app = TestApp::spawn().await;
    app.identity.add_google_code("code-3", "gina@example.com", "Gina");

    start_google_sign_in(&app, "/").await;
    let resp = app
        .get("/auth/google/callback?code=code-3&state=forged")
        .await;
    assert_eq!(location(&resp), "/login?error=google_failed");

    // The pending state was consumed by the failed attempt
    let state = start_google_sign_in(&app, "/").await;
    let resp = app
        .get(&format!("/auth/google/callback?error=access_denied&state={state}"))
        .await;
    assert_eq!(location(&resp), "/login?error=google_cancelled");

    // A callback with no sign-in in progress
    let resp = app
        .get(&format!("/auth/google/callback?code=code-3&state={state}"))
        .await;
    assert_eq!(location(&resp), "/login?error=google_failed");

    assert!(app.identity.requests().is_empty());
    assert_eq!(app.get("/my-posts").await.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_google_sign_in_unavailable_without_client() {
    let app = TestApp::spawn_with(|config| config.google = None).await;

    let resp = app.get("/auth/google").await;
    assert_eq!(location(&resp), "/login?error=google_unavailable");

    let login = app.get("/login").await.text().await.expect("body");
    assert!(!login.contains("Continue with Google"));
}

// ============================================================================
// Access guards
// ============================================================================

#[tokio::test]
async fn test_private_page_redirects_to_login() {
    let app = TestApp::spawn().await;

    let resp = app.get("/my-posts").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let target = location(&resp);
    assert!(target.starts_with("/login?redirect=%2Fmy-posts"));
    assert!(target.contains("info=login_required"));
}

#[tokio::test]
async fn test_admin_pages_deny_regular_users() {
    let app = TestApp::spawn().await;

    // Anonymous
    let resp = app.get("/admin/users").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).contains("admin_required=true"));

    // Signed in without admin rights
    app.identity.add_account("ann@example.com", "Abc123");
    app.forum.add_user("ann@example.com", "Ann", false);
    app.sign_in("ann@example.com", "Abc123", false).await;

    let resp = app.get("/admin").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let target = location(&resp);
    assert!(target.starts_with("/login?redirect=%2Fadmin"));
    assert!(target.contains("admin_required=true"));
}

#[tokio::test]
async fn test_admin_login_refused_for_non_admin() {
    let app = TestApp::spawn().await;
    app.identity.add_account("ann@example.com", "Abc123");
    app.forum.add_user("ann@example.com", "Ann", false);

    let resp = app.sign_in("ann@example.com", "Abc123", true).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let target = location(&resp);
    assert!(target.contains("admin_required=true"));
    assert!(target.contains("error=not_admin"));

    // Nothing was stored
    let resp = app.get("/my-posts").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_logout_clears_identity_and_admin_marker() {
    let app = TestApp::spawn().await;
    app.identity.add_account("boss@example.com", "Abc123");
    app.forum.add_user("boss@example.com", "Boss", true);

    let resp = app.sign_in("boss@example.com", "Abc123", true).await;
    assert_eq!(location(&resp), "/?success=logged_in");

    let resp = app.get("/admin").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app.get("/admin/users").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.expect("body").contains("boss@example.com"));

    let resp = app.post_form("/logout", &[]).await;
    assert_eq!(location(&resp), "/?success=logged_out");

    let resp = app.get("/admin").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).contains("admin_required=true"));
    let resp = app.get("/my-posts").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

/// Sign ann in as a plain user, then plant an admin marker whose cached
/// profile cannot be read, so the guard has to ask the forum API.
async fn plant_unreadable_admin_marker(app: &TestApp) {
    app.identity.add_account("ann@example.com", "Abc123");
    app.forum.add_user("ann@example.com", "Ann", false);
    app.sign_in("ann@example.com", "Abc123", false).await;
    app.edit_session(|data| {
        data.insert("admin_email".to_string(), json!("ann@example.com"));
        data.insert("admin_profile".to_string(), json!("{broken"));
    })
    .await;
}

#[tokio::test]
async fn test_admin_marker_rejected_by_api_is_cleared() {
    let app = TestApp::spawn().await;
    plant_unreadable_admin_marker(&app).await;

    let resp = app.get("/admin").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let target = location(&resp);
    assert!(target.contains("admin_required=true"));
    assert!(target.contains("error=not_admin"));
    assert_eq!(app.forum.requests_to(&Method::GET, "/admin/check").len(), 1);

    let session = app.session_data().await;
    assert!(!session.contains_key("admin_email"));
    assert!(!session.contains_key("admin_profile"));
    // The identity session survives
    assert_eq!(app.get("/my-posts").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_check_failure_without_fallback_is_denied() {
    let app = TestApp::spawn().await;
    plant_unreadable_admin_marker(&app).await;
    app.forum.fail(Method::GET, "/admin/check");

    let resp = app.get("/admin").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).contains("error=admin_verify_failed"));
    assert!(!app.forum.requests_to(&Method::GET, "/admin/check").is_empty());

    // Nothing is cleared on an unanswered check
    let session = app.session_data().await;
    assert_eq!(session["admin_email"], "ann@example.com");
}

#[tokio::test]
async fn test_admin_check_failure_falls_back_to_allow_list_without_caching() {
    let app = TestApp::spawn_with(|config| {
        config.admin_fallback = AdminAllowList::new(["Ann@Example.com"]);
    })
    .await;
    plant_unreadable_admin_marker(&app).await;
    app.forum.fail(Method::GET, "/admin/check");

    let resp = app.get("/admin").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let session = app.session_data().await;
    assert_eq!(session["admin_profile"], "{broken");

    // Still unconfirmed, so the next visit asks again
    app.get("/admin").await;
    assert_eq!(app.forum.requests_to(&Method::GET, "/admin/check").len(), 2);
}

// ============================================================================
// Votes
// ============================================================================

#[tokio::test]
async fn test_anonymous_vote_is_not_sent() {
    let app = TestApp::spawn().await;
    let id = app.forum.add_post("writer@example.com", "Hello hive", Utc::now());

    let resp = app
        .post_form(
            &format!("/posts/{id}/vote"),
            &[("vote_type", "up"), ("return_to", "/")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/?error=vote_login_required");
    assert!(app.forum.requests_to(&Method::PATCH, "/posts").is_empty());
}

#[tokio::test]
async fn test_signed_in_vote_returns_fragment_for_htmx() {
    let app = TestApp::spawn().await;
    let id = app.forum.add_post("writer@example.com", "Hello hive", Utc::now());
    app.identity.add_account("ann@example.com", "Abc123");
    app.forum.add_user("ann@example.com", "Ann", false);
    app.sign_in("ann@example.com", "Abc123", false).await;

    let resp = app
        .client
        .post(app.url(&format!("/posts/{id}/vote")))
        .header("HX-Request", "true")
        .form(&[("vote_type", "up"), ("return_to", "/")])
        .send()
        .await
        .expect("vote");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("body");
    assert!(body.contains(&format!("post-{id}")));

    let votes = app.forum.requests_to(&Method::PATCH, "/posts");
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].body["voteType"], "up");
    assert_eq!(votes[0].body["userEmail"], "ann@example.com");
}

// ============================================================================
// Daily post quota
// ============================================================================

#[tokio::test]
async fn test_basic_member_over_quota_is_sent_to_membership() {
    let app = TestApp::spawn().await;
    app.identity.add_account("ann@example.com", "Abc123");
    app.forum.add_user("ann@example.com", "Ann", false);
    app.forum.add_membership("ann@example.com", "basic");
    for n in 0..5 {
        app.forum
            .add_post("ann@example.com", &format!("Post {n}"), Utc::now());
    }
    app.sign_in("ann@example.com", "Abc123", false).await;

    let resp = app.get("/add-post").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/membership?error=post_limit");
}

#[tokio::test]
async fn test_post_over_quota_is_not_sent() {
    let app = TestApp::spawn().await;
    app.identity.add_account("ann@example.com", "Abc123");
    app.forum.add_user("ann@example.com", "Ann", false);
    app.forum.add_membership("ann@example.com", "basic");
    for n in 0..5 {
        app.forum
            .add_post("ann@example.com", &format!("Post {n}"), Utc::now());
    }
    app.sign_in("ann@example.com", "Abc123", false).await;

    let resp = app
        .post_form(
            "/add-post",
            &[
                ("title", "One more"),
                ("description", "Over the daily limit"),
                ("tag", "technology"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/membership?error=post_limit");
    assert!(
        app.forum
            .requests_to(&Method::POST, "/posts")
            .iter()
            .all(|r| r.path != "/posts")
    );
}

#[tokio::test]
async fn test_premium_member_is_not_limited() {
    let app = TestApp::spawn().await;
    app.identity.add_account("ann@example.com", "Abc123");
    app.forum.add_user("ann@example.com", "Ann", false);
    app.forum.add_membership("ann@example.com", "premium");
    for n in 0..5 {
        app.forum
            .add_post("ann@example.com", &format!("Post {n}"), Utc::now());
    }
    app.sign_in("ann@example.com", "Abc123", false).await;

    let resp = app.get("/add-post").await;
    assert_eq!(resp.status(), StatusCode::OK);
}

// ============================================================================
// Profiles
// ============================================================================

#[tokio::test]
async fn test_profile_degrades_when_user_lookup_fails() {
    let app = TestApp::spawn().await;
    app.forum.add_user("ann@example.com", "Ann", false);
    app.forum.add_post("ann@example.com", "Hello hive", Utc::now());
    app.forum.fail(Method::GET, "/users/ann@example.com");

    let resp = app.get("/profile/ann@example.com").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("body");
    assert!(body.contains("Failed to load profile details"));
    assert!(body.contains("ann@example.com"));
    assert!(body.contains("Hello hive"));
}

#[tokio::test]
async fn test_profile_of_unknown_user_is_not_found() {
    let app = TestApp::spawn().await;

    let resp = app.get("/profile/nobody@example.com").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
