//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::validation::ValidationErrors;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] tienda_core::EmailError),

    /// Invalid credentials (wrong password, wrong answer or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Credentials were correct but the account carries a block reason.
    #[error("account is blocked")]
    Blocked,

    /// Account already exists.
    #[error("account already exists")]
    AlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Form input failed validation.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
