//! Handler error type and Sentry scope helpers.
//!
//! Handlers return [`Result`]. Failures that are the server's fault are
//! reported to Sentry and logged before a bare status line goes back to the
//! browser; the rest map to a 4xx with a short, safe message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use tienda_core::{Email, PrincipalKind};

use crate::db::RepositoryError;
use crate::services::auth::AuthError;

/// Everything a storefront handler can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A handler reached a state its own checks should have ruled out.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Auth(AuthError::InvalidCredentials | AuthError::Blocked) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Auth(AuthError::AlreadyExists) => StatusCode::CONFLICT,
            Self::Auth(
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) | AuthError::Validation(_),
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
            | Self::Database(_)
            | Self::Session(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body text; server-side failures never leak their cause.
    fn public_message(&self) -> String {
        match self {
            Self::Auth(AuthError::InvalidCredentials) => crate::routes::INVALID_CREDENTIALS.to_owned(),
            Self::Auth(AuthError::Blocked) => "This account has been suspended".to_owned(),
            Self::Auth(AuthError::AlreadyExists) => "That email is already registered".to_owned(),
            Self::Auth(AuthError::WeakPassword(reason)) => reason.clone(),
            Self::Auth(AuthError::InvalidEmail(e)) => format!("Email: {e}"),
            Self::Auth(AuthError::Validation(errors)) => errors.to_string(),
            _ => "Something went wrong on our side".to_owned(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Request failed");
        }

        (status, self.public_message()).into_response()
    }
}

/// Result alias used by every handler.
pub type Result<T> = std::result::Result<T, AppError>;

/// Attach the logged-in principal to subsequent Sentry events.
pub fn track_principal(kind: PrincipalKind, id: &impl ToString, email: &Email) {
    sentry::configure_scope(|scope| {
        scope.set_tag("principal", kind);
        scope.set_user(Some(sentry::User {
            id: Some(id.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Detach the principal after a logout.
pub fn forget_principal() {
    sentry::configure_scope(|scope| {
        scope.remove_tag("principal");
        scope.set_user(None);
    });
}

/// Record an info-level breadcrumb with string key/value data.
///
/// ```rust,ignore
/// breadcrumb("admin", "Filtered clients", &[("mode", "spend")]);
/// ```
pub fn breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        data: data
            .iter()
            .map(|(k, v)| ((*k).to_owned(), serde_json::Value::from(*v)))
            .collect(),
        ..Default::default()
    });
}
