//! Tienda storefront library.
//!
//! User registration and login, the personal area, and the administration of
//! users and clients, served as server-rendered pages.
//!
//! This crate provides the storefront as a library so the binary, the CLI and
//! the integration tests share one router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use state::AppState;

/// Build the storefront router over a session store.
///
/// Sentry layers are added by the binary so tests run without them.
pub fn app<S>(state: AppState, store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = middleware::create_session_layer(store, state.config());

    Router::new()
        .merge(routes::routes())
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
