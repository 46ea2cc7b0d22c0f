//! Reference catalog entities.
//!
//! Small, fixed lists seeded by migration and memoised per session.

use serde::{Deserialize, Serialize};

use tienda_core::{BlockReasonId, ClientTypeId, RecoveryQuestionId};

/// Client classification (e.g. standard, premium).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientType {
    pub id: ClientTypeId,
    pub code: String,
    pub name: String,
}

/// Reason attached to a user to suspend the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockReason {
    pub id: BlockReasonId,
    pub name: String,
}

/// Password recovery question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryQuestion {
    pub id: RecoveryQuestionId,
    pub question: String,
}
