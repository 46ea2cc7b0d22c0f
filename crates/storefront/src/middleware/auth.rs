//! Authentication extractors.
//!
//! Gate handlers on an authenticated user or administrator. Each principal
//! kind is checked independently and redirects to its own login page.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};

use tienda_core::PrincipalKind;

use super::session::SessionContext;
use crate::error::AppError;
use crate::models::{CurrentAdministrator, CurrentUser};
use crate::session::UserLogin;

/// Path of the password step of the user login.
pub const USER_PASSWORD_PATH: &str = "/auth/password";

/// Extractor that requires an authenticated user.
///
/// Redirects to the password page when only the email has been entered, and to
/// the email page otherwise.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireUser(user): RequireUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Extractor that requires an authenticated administrator.
pub struct RequireAdministrator(pub CurrentAdministrator);

/// Rejection returned by the authentication extractors.
pub enum AuthRejection {
    /// Send the browser to a login step.
    Redirect(&'static str),
    /// The session could not be read.
    Failed(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(path) => Redirect::to(path).into_response(),
            Self::Failed(err) => err.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = SessionContext::from_request_parts(parts, state)
            .await
            .map_err(AuthRejection::Failed)?;

        match ctx.user_login() {
            UserLogin::Authenticated { user } => Ok(Self(user.clone())),
            UserLogin::EmailCaptured { .. } => Err(AuthRejection::Redirect(USER_PASSWORD_PATH)),
            UserLogin::Anonymous => Err(AuthRejection::Redirect(PrincipalKind::User.login_path())),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdministrator
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = SessionContext::from_request_parts(parts, state)
            .await
            .map_err(AuthRejection::Failed)?;

        ctx.current_administrator()
            .cloned()
            .map(Self)
            .ok_or(AuthRejection::Redirect(
                PrincipalKind::Administrator.login_path(),
            ))
    }
}
