//! Client record domain types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tienda_core::{Amount, ClientId, ClientTypeId, UserId};

/// A client record: the purchasing profile attached one-to-one to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Unique client ID.
    pub id: ClientId,
    /// The user this profile belongs to.
    pub user_id: UserId,
    /// Given name.
    pub first_name: String,
    /// Surname, used by the surname filter.
    pub surname: String,
    /// Client classification.
    pub client_type: ClientTypeId,
    /// Date the client profile was registered.
    pub registered_on: NaiveDate,
    /// Accumulated spend, used by the spend range filter.
    pub spend: Amount,
}

impl Client {
    /// Create a fresh profile for a user with zero spend.
    #[must_use]
    pub fn new(
        user_id: UserId,
        first_name: String,
        surname: String,
        client_type: ClientTypeId,
        registered_on: NaiveDate,
    ) -> Self {
        Self {
            id: ClientId::generate(),
            user_id,
            first_name,
            surname,
            client_type,
            registered_on,
            spend: Amount::ZERO,
        }
    }

    /// Full display name.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname)
    }
}
