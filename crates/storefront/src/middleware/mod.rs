//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions)
//!
//! Handlers then use the [`SessionContext`], [`RequireUser`] and
//! [`RequireAdministrator`] extractors.

pub mod auth;
pub mod session;

pub use auth::{AuthRejection, RequireAdministrator, RequireUser, USER_PASSWORD_PATH};
pub use session::{SESSION_COOKIE_NAME, SessionContext, create_session_layer};
