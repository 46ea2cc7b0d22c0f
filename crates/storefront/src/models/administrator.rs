//! Administrator domain types.

use chrono::{DateTime, Utc};

use tienda_core::{AdministratorId, Email};

/// A store administrator (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Administrator {
    /// Unique administrator ID.
    pub id: AdministratorId,
    /// Administrator's email address.
    pub email: Email,
    /// When the administrator was created.
    pub created_at: DateTime<Utc>,
}
