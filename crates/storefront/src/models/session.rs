//! Session-related types.
//!
//! Minimal principal identities and flash messages kept in the session state.

use serde::{Deserialize, Serialize};

use tienda_core::{AdministratorId, Email, UserId};

use super::administrator::Administrator;
use super::user::User;

/// Session-stored user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// Session-stored administrator identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdministrator {
    /// Administrator's database ID.
    pub id: AdministratorId,
    /// Administrator's email address.
    pub email: Email,
}

impl From<&Administrator> for CurrentAdministrator {
    fn from(admin: &Administrator) -> Self {
        Self {
            id: admin.id,
            email: admin.email.clone(),
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Flash {
    Error(String),
    Success(String),
}

impl Flash {
    /// The message text.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Error(msg) | Self::Success(msg) => msg,
        }
    }

    /// Whether this is an error message.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Session keys.
pub mod keys {
    /// Key for the whole session state value.
    pub const SESSION_STATE: &str = "session_state";
}
