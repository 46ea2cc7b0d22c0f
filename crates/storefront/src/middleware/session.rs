//! Session middleware configuration and the per-request session state.
//!
//! Production uses the `PostgreSQL`-backed tower-sessions store; tests plug in
//! `tower_sessions::MemoryStore`.

use std::ops::{Deref, DerefMut};

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::models::session_keys;
use crate::session::SessionState;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "tienda_session";

/// Create the session layer over the given store.
///
/// # Arguments
///
/// * `store` - Session store (`PostgresStore` in production)
/// * `config` - Storefront configuration (cookie security and idle expiry)
#[must_use]
pub fn create_session_layer<S>(store: S, config: &StorefrontConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::minutes(config.session_idle_minutes),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Extractor giving a handler the [`SessionState`] of the current session.
///
/// A session without stored state starts from `SessionState::default()`.
/// Changes are only persisted by [`SessionContext::save`].
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(mut ctx: SessionContext) -> Result<Redirect> {
///     ctx.clear_current_administrator();
///     ctx.save().await?;
///     Ok(Redirect::to("/admin/login"))
/// }
/// ```
pub struct SessionContext {
    session: Session,
    state: SessionState,
}

impl SessionContext {
    /// Load the state stored in `session`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the store cannot be read.
    pub async fn load(session: Session) -> Result<Self, AppError> {
        let state = session
            .get::<SessionState>(session_keys::SESSION_STATE)
            .await?
            .unwrap_or_default();
        Ok(Self { session, state })
    }

    /// Write the state back to the session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the store cannot be written.
    pub async fn save(&self) -> Result<(), AppError> {
        self.session
            .insert(session_keys::SESSION_STATE, &self.state)
            .await?;
        Ok(())
    }

    /// Issue a new session ID, keeping the data (call on login).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the store cannot be updated.
    pub async fn cycle_id(&self) -> Result<(), AppError> {
        self.session.cycle_id().await?;
        Ok(())
    }
}

impl Deref for SessionContext {
    type Target = SessionState;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl DerefMut for SessionContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.state
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer is not installed".to_string()))?;

        Self::load(session).await
    }
}
