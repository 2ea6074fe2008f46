//! End-to-end test harness for the VibeHive front end.
//!
//! Each [`TestApp`] runs the real router on an ephemeral port, wired to two
//! in-process fakes:
//!
//! - [`FakeForum`] - the remote forum API, with in-memory users, posts and
//!   memberships, and a log of every request it received
//! - [`FakeIdentity`] - the identity provider's sign-up, sign-in, Google
//!   sign-in and profile update calls, plus Google's token endpoint
//!
//! ```rust,ignore
//! let app = TestApp::spawn().await;
//! app.identity.add_account("a@b.com", "Abc123");
//! let resp = app.sign_in("a@b.com", "Abc123", false).await;
//! assert_eq!(location(&resp), "/?success=logged_in");
//! ```
//!
//! The login and register posts are rate limited per app instance (burst of
//! five), so a single test should stay well under that.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Form, Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use chrono::{DateTime, Utc};
use reqwest::cookie::{CookieStore, Jar};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower_sessions::session::{Id, Record};
use tower_sessions::{MemoryStore, SessionStore};
use vibehive_core::guard::AdminAllowList;
use vibehive_web::config::{ApiConfig, GoogleConfig, IdentityConfig, SentryConfig, WebConfig};
use vibehive_web::middleware::session::SESSION_COOKIE_NAME;
use vibehive_web::state::AppState;

// =============================================================================
// Request log
// =============================================================================

/// A request received by a fake service.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: Value,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn decode_body(body: &Bytes) -> Value {
    if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body).unwrap_or(Value::Null)
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, axum::Json(json!({"message": "Not found"}))).into_response()
}

async fn serve_router(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake service");
    let addr = listener.local_addr().expect("Fake service has no address");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Fake service stopped");
    });
    addr
}

// =============================================================================
// Fake forum API
// =============================================================================

#[derive(Default)]
struct ForumData {
    users: Vec<Value>,
    posts: Vec<Value>,
    memberships: HashMap<String, Value>,
    /// (method, decoded path prefix) pairs answered with a 500.
    failing: Vec<(Method, String)>,
    requests: Vec<Recorded>,
}

impl ForumData {
    fn user_index(&self, key: &str, value: &str) -> Option<usize> {
        self.users
            .iter()
            .position(|user| user[key].as_str().is_some_and(|v| v.eq_ignore_ascii_case(value)))
    }

    fn posts_where(&self, key: &str, value: &str) -> Value {
        Value::Array(
            self.posts
                .iter()
                .filter(|post| post[key].as_str() == Some(value))
                .cloned()
                .collect(),
        )
    }
}

/// In-memory stand-in for the remote forum API.
#[derive(Clone, Default)]
pub struct FakeForum {
    data: Arc<Mutex<ForumData>>,
}

impl FakeForum {
    /// Add a user record.
    pub fn add_user(&self, email: &str, name: &str, admin: bool) {
        let mut data = lock(&self.data);
        let id = format!("u{}", data.users.len() + 1);
        data.users.push(json!({
            "_id": id,
            "name": name,
            "email": email,
            "role": if admin { "admin" } else { "user" },
            "createdAt": Utc::now(),
        }));
    }

    /// Attach an active membership (`basic` or `premium`).
    pub fn add_membership(&self, email: &str, plan: &str) {
        let now = Utc::now();
        lock(&self.data).memberships.insert(
            email.to_lowercase(),
            json!({
                "email": email.to_lowercase(),
                "plan": plan,
                "isActive": true,
                "startDate": now,
                "expireDate": now + chrono::Duration::days(30),
            }),
        );
    }

    /// Add a post and return its id.
    pub fn add_post(&self, author_email: &str, title: &str, created_at: DateTime<Utc>) -> String {
        let mut data = lock(&self.data);
        let id = format!("p{}", data.posts.len() + 1);
        data.posts.push(json!({
            "_id": id,
            "title": title,
            "description": format!("About {title}"),
            "authorName": "Member",
            "authorEmail": author_email,
            "tag": "technology",
            "upVote": 0,
            "downVote": 0,
            "createdAt": created_at,
        }));
        id
    }

    /// Answer requests with this method and decoded path prefix with a 500.
    pub fn fail(&self, method: Method, prefix: &str) {
        lock(&self.data).failing.push((method, prefix.to_string()));
    }

    /// Current record for an email, if any.
    #[must_use]
    pub fn user(&self, email: &str) -> Option<Value> {
        let data = lock(&self.data);
        data.user_index("email", email)
            .and_then(|index| data.users.get(index).cloned())
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        lock(&self.data).requests.clone()
    }

    /// Requests with the given method whose path starts with `prefix`.
    #[must_use]
    pub fn requests_to(&self, method: &Method, prefix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == *method && r.path.starts_with(prefix))
            .collect()
    }

    async fn start(&self) -> SocketAddr {
        let router = Router::new().fallback(forum_api).with_state(self.clone());
        serve_router(router).await
    }
}

async fn forum_api(State(forum): State<FakeForum>, method: Method, uri: Uri, body: Bytes) -> Response {
    let body = decode_body(&body);
    let mut data = lock(&forum.data);
    data.requests.push(Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        body: body.clone(),
    });

    let segments: Vec<String> = uri
        .path()
        .trim_start_matches('/')
        .split('/')
        .map(|s| urlencoding::decode(s).map_or_else(|_| s.to_string(), |d| d.into_owned()))
        .collect();
    let decoded_path = format!("/{}", segments.join("/"));
    if data
        .failing
        .iter()
        .any(|(m, prefix)| *m == method && decoded_path.starts_with(prefix.as_str()))
    {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({"message": "Internal server error"})),
        )
            .into_response();
    }
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

    match (method, segments.as_slice()) {
        (Method::GET, ["posts"]) => axum::Json(Value::Array(data.posts.clone())).into_response(),
        (Method::POST, ["posts"]) => {
            let mut post = body;
            post["_id"] = json!(format!("p{}", data.posts.len() + 1));
            data.posts.push(post);
            StatusCode::CREATED.into_response()
        }
        (Method::GET, ["posts", "search", tag]) => {
            axum::Json(data.posts_where("tag", tag)).into_response()
        }
        (Method::GET, ["posts", "post", id]) => data
            .posts
            .iter()
            .find(|post| post["_id"] == *id)
            .map_or_else(not_found, |post| axum::Json(post.clone()).into_response()),
        (Method::GET, ["posts", email]) => {
            axum::Json(json!({ "posts": data.posts_where("authorEmail", email) })).into_response()
        }
        (Method::PATCH, ["posts", id, "vote"]) => {
            let field = if body["voteType"] == "down" { "downVote" } else { "upVote" };
            match data.posts.iter_mut().find(|post| post["_id"] == *id) {
                Some(post) => {
                    post[field] = json!(post[field].as_i64().unwrap_or(0) + 1);
                    axum::Json(json!({ "post": post.clone() })).into_response()
                }
                None => not_found(),
            }
        }
        (Method::GET, ["posts", _, "comments"] | ["reported-comments"] | ["tags"] | ["announcements"]) => {
            axum::Json(json!([])).into_response()
        }
        (Method::POST, ["announcements" | "tags"] | ["posts", _, "comments"]) => {
            StatusCode::CREATED.into_response()
        }
        (Method::GET, ["users"]) => axum::Json(Value::Array(data.users.clone())).into_response(),
        (Method::POST, ["users"]) => {
            let mut user = body;
            user["_id"] = json!(format!("u{}", data.users.len() + 1));
            data.users.push(user);
            StatusCode::CREATED.into_response()
        }
        (Method::GET, ["users", "membership", email]) => data
            .memberships
            .get(&email.to_lowercase())
            .map_or_else(not_found, |m| axum::Json(m.clone()).into_response()),
        (Method::POST, ["users", "membership"]) => {
            let email = body["email"].as_str().unwrap_or_default().to_lowercase();
            data.memberships.insert(email, body);
            StatusCode::CREATED.into_response()
        }
        (Method::PATCH, ["users", "make-admin", id]) => match data.user_index("_id", id) {
            Some(index) => {
                if let Some(user) = data.users.get_mut(index) {
                    user["role"] = json!("admin");
                }
                StatusCode::OK.into_response()
            }
            None => not_found(),
        },
        (Method::GET, ["users", email]) => match data.user_index("email", email) {
            Some(index) => axum::Json(data.users.get(index).cloned()).into_response(),
            None => not_found(),
        },
        (Method::GET, ["admin", "check", email]) => {
            let user = data
                .user_index("email", email)
                .and_then(|index| data.users.get(index));
            let is_admin = user.is_some_and(|user| user["role"] == "admin");
            axum::Json(json!({
                "isAdmin": is_admin,
                "name": user.and_then(|user| user["name"].as_str()),
                "email": email,
            }))
            .into_response()
        }
        (Method::GET, ["forum-stats"]) => axum::Json(json!({
            "totalPosts": data.posts.len(),
            "totalComments": 0,
            "totalUsers": data.users.len(),
        }))
        .into_response(),
        _ => not_found(),
    }
}

// =============================================================================
// Fake identity provider
// =============================================================================

#[derive(Default)]
struct IdentityData {
    /// email -> (password, uid)
    accounts: HashMap<String, (String, String)>,
    /// Google authorization code -> (email, display name)
    google_codes: HashMap<String, (String, String)>,
    requests: Vec<Recorded>,
}

/// In-memory stand-in for the identity provider.
#[derive(Clone, Default)]
pub struct FakeIdentity {
    data: Arc<Mutex<IdentityData>>,
}

impl FakeIdentity {
    /// Register an account directly and return its uid.
    pub fn add_account(&self, email: &str, password: &str) -> String {
        let mut data = lock(&self.data);
        let uid = format!("uid-{}", data.accounts.len() + 1);
        data.accounts
            .insert(email.to_lowercase(), (password.to_string(), uid.clone()));
        uid
    }

    /// Uid of an existing account.
    #[must_use]
    pub fn uid_of(&self, email: &str) -> Option<String> {
        lock(&self.data)
            .accounts
            .get(&email.to_lowercase())
            .map(|(_, uid)| uid.clone())
    }

    /// Make Google's token endpoint accept `code` for this person.
    pub fn add_google_code(&self, code: &str, email: &str, name: &str) {
        lock(&self.data).google_codes.insert(
            code.to_string(),
            (email.to_lowercase(), name.to_string()),
        );
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        lock(&self.data).requests.clone()
    }

    async fn start(&self) -> SocketAddr {
        let router = Router::new()
            .route("/v1/{method}", post(identity_api))
            .route("/token", post(google_token))
            .with_state(self.clone());
        serve_router(router).await
    }
}

fn provider_error(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({ "error": { "code": 400, "message": message } })),
    )
        .into_response()
}

fn session_body(email: &str, uid: &str) -> Response {
    axum::Json(json!({
        "idToken": format!("token-{uid}"),
        "localId": uid,
        "email": email,
        "refreshToken": "refresh",
    }))
    .into_response()
}

async fn identity_api(
    State(identity): State<FakeIdentity>,
    Path(method): Path<String>,
    body: Bytes,
) -> Response {
    let body = decode_body(&body);
    let mut data = lock(&identity.data);
    data.requests.push(Recorded {
        method: Method::POST,
        path: format!("/v1/{method}"),
        body: body.clone(),
    });

    let email = body["email"].as_str().unwrap_or_default().to_lowercase();
    let password = body["password"].as_str().unwrap_or_default().to_string();

    match method.as_str() {
        "accounts:signUp" => {
            if data.accounts.contains_key(&email) {
                return provider_error("EMAIL_EXISTS");
            }
            let uid = format!("uid-{}", data.accounts.len() + 1);
            data.accounts.insert(email.clone(), (password, uid.clone()));
            session_body(&email, &uid)
        }
        "accounts:signInWithPassword" => match data.accounts.get(&email) {
            Some((stored, uid)) if *stored == password => session_body(&email, uid),
            _ => provider_error("INVALID_LOGIN_CREDENTIALS"),
        },
        "accounts:update" => axum::Json(json!({})).into_response(),
        "accounts:signInWithIdp" => {
            // postBody is "id_token=google-<code>&providerId=google.com"
            let code = body["postBody"]
                .as_str()
                .and_then(|post_body| post_body.strip_prefix("id_token=google-"))
                .and_then(|rest| rest.split('&').next())
                .unwrap_or_default();
            let Some((email, name)) = data.google_codes.get(code).cloned() else {
                return provider_error("INVALID_IDP_RESPONSE");
            };
            let existing = data.accounts.get(&email).map(|(_, uid)| uid.clone());
            let is_new_user = existing.is_none();
            let uid = existing.unwrap_or_else(|| format!("uid-{}", data.accounts.len() + 1));
            if is_new_user {
                data.accounts.insert(email.clone(), (String::new(), uid.clone()));
            }
            axum::Json(json!({
                "idToken": format!("token-{uid}"),
                "localId": uid,
                "email": email,
                "displayName": name,
                "isNewUser": is_new_user,
            }))
            .into_response()
        }
        _ => provider_error("OPERATION_NOT_ALLOWED"),
    }
}

async fn google_token(
    State(identity): State<FakeIdentity>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let mut data = lock(&identity.data);
    data.requests.push(Recorded {
        method: Method::POST,
        path: "/token".to_string(),
        body: json!(form),
    });

    let code = form.get("code").cloned().unwrap_or_default();
    if form.get("grant_type").map(String::as_str) != Some("authorization_code")
        || !data.google_codes.contains_key(&code)
    {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({"error": "invalid_grant", "error_description": "Bad Request"})),
        )
            .into_response();
    }
    axum::Json(json!({ "id_token": format!("google-{code}"), "token_type": "Bearer" }))
        .into_response()
}

// =============================================================================
// Application under test
// =============================================================================

/// The front end running against fresh fakes.
pub struct TestApp {
    pub base_url: String,
    /// Cookie-keeping client that does not follow redirects.
    pub client: reqwest::Client,
    pub forum: FakeForum,
    pub identity: FakeIdentity,
    cookies: Arc<Jar>,
    sessions: MemoryStore,
}

impl TestApp {
    /// Start both fakes and the front end.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Start both fakes and the front end, adjusting the config first.
    pub async fn spawn_with(configure: impl FnOnce(&mut WebConfig)) -> Self {
        let forum = FakeForum::default();
        let identity = FakeIdentity::default();
        let forum_addr = forum.start().await;
        let identity_addr = identity.start().await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind app");
        let addr = listener.local_addr().expect("App has no address");

        let timeout = Duration::from_secs(5);
        let mut config = WebConfig {
            host: addr.ip(),
            port: addr.port(),
            base_url: format!("http://{addr}"),
            static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../web/static"),
            api: ApiConfig {
                base_url: format!("http://{forum_addr}"),
                timeout,
            },
            identity: IdentityConfig {
                base_url: format!("http://{identity_addr}"),
                api_key: SecretString::from("test-api-key"),
                timeout,
            },
            google: Some(GoogleConfig {
                client_id: "test-client.apps.googleusercontent.com".to_string(),
                client_secret: SecretString::from("test-client-secret"),
                authorize_url: format!("http://{identity_addr}/authorize"),
                token_url: format!("http://{identity_addr}/token"),
            }),
            admin_fallback: AdminAllowList::default(),
            announcement_poll_interval: Duration::from_secs(60),
            log_json: false,
            sentry: SentryConfig::default(),
        };
        configure(&mut config);

        let state = AppState::new(config).expect("Failed to build app state");
        let sessions = state.sessions().clone();
        let app = vibehive_web::build_router(state);
        tokio::spawn(async move {
            vibehive_web::serve(listener, app, std::future::pending())
                .await
                .expect("App server stopped");
        });

        let cookies = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            client,
            forum,
            identity,
            cookies,
            sessions,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    /// Submit the login form.
    pub async fn sign_in(&self, email: &str, password: &str, admin: bool) -> reqwest::Response {
        let mut form = vec![("email", email), ("password", password), ("redirect", "/")];
        if admin {
            form.push(("admin", "on"));
        }
        self.post_form("/login", &form).await
    }
}

impl TestApp {
    fn session_id(&self) -> Option<Id> {
        let url = reqwest::Url::parse(&self.base_url).ok()?;
        let header = self.cookies.cookies(&url)?;
        header
            .to_str()
            .ok()?
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE_NAME)
            .and_then(|(_, value)| Id::from_str(value).ok())
    }

    /// Stored data of this client's session, as the server sees it.
    pub async fn session_data(&self) -> HashMap<String, Value> {
        self.session_record().await.data
    }

    /// Rewrite this client's stored session data in place.
    pub async fn edit_session(&self, edit: impl FnOnce(&mut HashMap<String, Value>)) {
        let mut record = self.session_record().await;
        edit(&mut record.data);
        self.sessions
            .save(&record)
            .await
            .expect("Failed to save session");
    }

    async fn session_record(&self) -> Record {
        let id = self.session_id().expect("Client has no session cookie");
        self.sessions
            .load(&id)
            .await
            .expect("Failed to load session")
            .expect("Session not found in store")
    }
}

/// The `Location` header of a redirect, or an empty string.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
