//! HTTP route handlers for the forum.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                            - Home page (tag filter, sort)
//! GET  /search                      - Posts by tag
//!
//! # Auth
//! GET  /login                       - Login page
//! POST /login                       - Login action (rate limited)
//! GET  /register                    - Register page
//! POST /register                    - Register action (rate limited)
//! GET  /auth/google                 - Start Google sign-in
//! GET  /auth/google/callback        - Google sign-in callback
//! POST /logout                      - Logout action
//!
//! # Posts (requires auth unless noted)
//! GET  /add-post                    - New post form (daily limit checked)
//! POST /add-post                    - Create post
//! GET  /edit-post/{id}              - Edit form, author only
//! POST /edit-post/{id}              - Update post, author only
//! GET  /my-posts                    - The user's posts
//! POST /posts/{id}/delete           - Delete one of the user's posts
//! POST /posts/{id}/vote             - Vote (post card fragment for HTMX)
//! GET  /posts/{id}/comments         - Comments page (public)
//! POST /posts/{id}/comments         - Add comment
//! GET  /comments/{id}               - Alias of the comments page (post id)
//! POST /comments/{id}/report        - Report a comment
//!
//! # Members
//! GET  /membership                  - Plans
//! POST /membership                  - Subscribe
//! GET  /profile/{email}             - Public profile
//!
//! # Notifications
//! GET  /notifications               - Announcement list
//! GET  /notifications/count         - Unread badge (fragment)
//! POST /notifications/read          - Mark all read
//!
//! # Admin (requires admin)
//! GET  /admin                       - Admin profile, stats and tags
//! POST /admin/tags                  - Add tag
//! POST /admin/tags/{id}/delete      - Delete tag
//! GET  /admin/users                 - Manage users
//! POST /admin/users/{id}/promote    - Make admin
//! GET  /admin/reports               - Reported comments
//! GET  /admin/announcements         - Announcement form
//! POST /admin/announcements         - Publish announcement
//! ```

pub mod admin;
pub mod auth;
pub mod comments;
pub mod home;
pub mod membership;
pub mod notifications;
pub mod posts;
pub mod profile;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    handler::Handler,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::filters;
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;
use crate::views::PageContext;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).post(auth::login.layer(auth_rate_limiter())),
        )
        .route(
            "/register",
            get(auth::register_page).post(auth::register.layer(auth_rate_limiter())),
        )
        .route("/auth/google", get(auth::google_start))
        .route("/auth/google/callback", get(auth::google_callback))
        .route("/logout", post(auth::logout))
}

/// Create the post routes router.
pub fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/add-post", get(posts::new_post).post(posts::create))
        .route("/edit-post/{id}", get(posts::edit).post(posts::update))
        .route("/my-posts", get(posts::my_posts))
        .route("/posts/{id}/delete", post(posts::delete))
        .route("/posts/{id}/vote", post(posts::vote))
        .route(
            "/posts/{id}/comments",
            get(comments::show).post(comments::create),
        )
        .route("/comments/{id}", get(comments::show))
        .route("/comments/{id}/report", post(comments::report))
}

/// Create the notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::index))
        .route("/count", get(notifications::count))
        .route("/read", post(notifications::mark_read))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::profile))
        .route("/tags", post(admin::add_tag))
        .route("/tags/{id}/delete", post(admin::delete_tag))
        .route("/users", get(admin::users))
        .route("/users/{id}/promote", post(admin::promote))
        .route("/reports", get(admin::reports))
        .route(
            "/announcements",
            get(admin::announcement_form).post(admin::announce),
        )
}

/// Create all page routes for the forum.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/search", get(home::search))
        .merge(auth_routes())
        .merge(post_routes())
        .route(
            "/membership",
            get(membership::index).post(membership::subscribe),
        )
        .route("/profile/{email}", get(profile::show))
        .nest("/notifications", notification_routes())
        .nest("/admin", admin_routes())
}

/// 404 page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/not_found.html")]
pub struct NotFoundTemplate {
    pub ctx: PageContext,
}

/// Fallback for unknown paths.
pub async fn not_found(ctx: PageContext) -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NotFoundTemplate { ctx })
}
