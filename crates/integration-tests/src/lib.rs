//! Integration tests for Tienda.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (in-memory repositories and sessions)
//! cargo test -p tienda-integration-tests
//!
//! # Live-server tests (requires a running storefront)
//! TIENDA_TEST_URL=http://127.0.0.1:8080 cargo test -p tienda-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `auth_flow` - Registration, two-step login, recovery and the personal area
//! - `admin_flow` - Administrator gate, user blocking, client listing and editing
//! - `live_server` - Smoke tests against a running server

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::net::{IpAddr, Ipv4Addr};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use secrecy::SecretString;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use tienda_core::Email;
use tienda_storefront::config::{SentryConfig, StorefrontConfig};
use tienda_storefront::db::{InMemoryStore, Repositories, UserRepository};
use tienda_storefront::models::User;
use tienda_storefront::services::AuthService;
use tienda_storefront::state::AppState;

/// Password used by the helpers that create accounts.
pub const PASSWORD: &str = "correct horse";

/// Recovery answer used by [`TestApp::register`].
pub const RECOVERY_ANSWER: &str = "Toby";

/// Administrator created by [`TestApp::with_administrator`].
pub const ADMIN_EMAIL: &str = "root@tienda.dev";

/// Configuration for in-process tests: plain HTTP, so cookies are not secure.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: url::Url::parse("http://localhost:8080").expect("valid url"),
        session_idle_minutes: 30,
        sentry: SentryConfig::default(),
    }
}

/// Response with the parts the tests look at.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestResponse {
    /// Assert a redirect and return its target.
    #[must_use]
    pub fn redirect_target(&self) -> &str {
        assert!(
            self.status.is_redirection(),
            "expected redirect, got {}: {}",
            self.status,
            self.body
        );
        self.location.as_deref().expect("redirect without location")
    }
}

/// The storefront router over an in-memory store, driven like one browser.
///
/// The session cookie set by a response is sent with every later request.
pub struct TestApp {
    router: Router,
    pub store: InMemoryStore,
    cookie: Option<String>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Fresh application with seeded catalogs and no accounts.
    #[must_use]
    pub fn new() -> Self {
        let store = InMemoryStore::seeded();
        let state = AppState::new(test_config(), Repositories::in_memory(&store));
        let router = tienda_storefront::app(state, MemoryStore::default());

        Self {
            router,
            store,
            cookie: None,
        }
    }

    /// Fresh application that also has an administrator.
    pub async fn with_administrator() -> Self {
        let app = Self::new();
        AuthService::new(&app.store, &app.store)
            .create_administrator(ADMIN_EMAIL, PASSWORD)
            .await
            .expect("create administrator");
        app
    }

    /// Another browser on the same application, without cookies.
    #[must_use]
    pub fn new_browser(&self) -> Self {
        Self {
            router: self.router.clone(),
            store: self.store.clone(),
            cookie: None,
        }
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = self.request("GET", path).body(Body::empty());
        self.send(request.expect("valid request")).await
    }

    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = self
            .request("POST", path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body));
        self.send(request.expect("valid request")).await
    }

    /// Register a user through the registration page.
    pub async fn register(&mut self, email: &str) -> User {
        let response = self
            .post_form(
                "/auth/register",
                &[
                    ("email", email),
                    ("password", PASSWORD),
                    ("confirm_password", PASSWORD),
                    ("recovery_question", "1"),
                    ("recovery_answer", RECOVERY_ANSWER),
                ],
            )
            .await;
        assert_eq!(response.redirect_target(), "/auth/login");

        self.user(email).await
    }

    /// Log a user in through both login steps.
    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        let response = self.post_form("/auth/login", &[("email", email)]).await;
        assert_eq!(response.redirect_target(), "/auth/password");
        self.post_form("/auth/password", &[("password", password)])
            .await
    }

    /// Log the administrator in.
    pub async fn login_administrator(&mut self) -> TestResponse {
        self.post_form(
            "/admin/login",
            &[("email", ADMIN_EMAIL), ("password", PASSWORD)],
        )
        .await
    }

    /// Look up a stored user by email.
    pub async fn user(&self, email: &str) -> User {
        let email = Email::parse(email).expect("valid email");
        UserRepository::find_credentials(&self.store, &email)
            .await
            .expect("repository")
            .map(|(user, _)| user)
            .expect("user exists")
    }

    fn request(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(path);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        if let Some(cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
        {
            self.cookie = Some(cookie.to_owned());
        }

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");

        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
