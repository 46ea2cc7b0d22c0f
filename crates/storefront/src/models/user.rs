//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.
//! Password and recovery-answer hashes never appear here; repositories hand
//! them out separately so they cannot leak into the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tienda_core::{BlockReasonId, Email, RecoveryQuestionId, UserId};

/// A customer/employee account (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Reason the account is suspended, if any.
    pub block_reason: Option<BlockReasonId>,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether a block reason is attached to this account.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        self.block_reason.is_some()
    }
}

/// Data needed to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: String,
    pub recovery_question: RecoveryQuestionId,
    pub recovery_answer_hash: String,
}

/// Stored password-recovery data for one user.
#[derive(Debug, Clone)]
pub struct StoredRecovery {
    pub user_id: UserId,
    pub question: RecoveryQuestionId,
    pub answer_hash: String,
}
