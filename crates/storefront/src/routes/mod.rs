//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Redirect to the login page
//! GET  /health                   - Liveness check
//! GET  /health/ready             - Readiness check
//!
//! # Auth
//! GET  /auth/register            - Register page
//! POST /auth/register            - Register action
//! GET  /auth/login               - Email page
//! POST /auth/login               - Capture the email
//! GET  /auth/password            - Password page
//! POST /auth/password            - Password action
//! GET  /auth/recover             - Recovery email page
//! POST /auth/recover             - Show the recovery question
//! POST /auth/recover/answer      - Check the answer, set a new password
//!
//! # Account (requires a user)
//! GET  /account                  - Personal area
//! POST /account/logout           - Logout action
//! GET  /account/profile          - Client profile form
//! POST /account/profile          - Create the client profile
//!
//! # Admin (requires an administrator)
//! GET  /admin/login              - Login page
//! POST /admin/login              - Login action
//! GET  /admin                    - Dashboard
//! POST /admin/logout             - Logout action
//! GET  /admin/users              - User list
//! GET  /admin/users/{id}/block   - Block form
//! POST /admin/users/{id}/block   - Block action
//! GET  /admin/clients            - Client list (reloaded)
//! POST /admin/clients            - Filter the client list
//! GET  /admin/clients/{id}       - Client detail
//! GET  /admin/clients/{id}/edit  - Client edit form
//! POST /admin/clients/{id}/edit  - Client edit action
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod views;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
};

use tienda_core::PrincipalKind;

use crate::state::AppState;

/// Landing page of an authenticated user.
pub const ACCOUNT_PATH: &str = "/account";

/// Shown for every failed login, whichever part was wrong.
pub const INVALID_CREDENTIALS: &str = "User and/or password are incorrect";

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/password", get(auth::password_page).post(auth::password))
        .route("/recover", get(auth::recover_page).post(auth::recover))
        .route("/recover/answer", post(auth::recover_answer))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/logout", post(account::logout))
        .route(
            "/profile",
            get(account::profile_page).post(account::create_profile),
        )
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::index))
        .route("/login", get(admin::login_page).post(admin::login))
        .route("/logout", post(admin::logout))
        .route("/users", get(admin::users))
        .route("/users/{id}/block", get(admin::block_page).post(admin::block))
        .route(
            "/clients",
            get(admin::clients).post(admin::filter_clients),
        )
        .route("/clients/{id}", get(admin::client_detail))
        .route(
            "/clients/{id}/edit",
            get(admin::edit_client_page).post(admin::edit_client),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/admin", admin_routes())
}

async fn home() -> Redirect {
    Redirect::to(PrincipalKind::User.login_path())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.catalog().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
