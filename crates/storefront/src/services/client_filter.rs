//! Parameterized client filter.
//!
//! The administration client listing submits a mode selector plus optional
//! criteria. [`ClientFilter::from_form`] turns that submission into a typed
//! filter and [`filter_clients`] applies it. Filtering is pure: the input slice
//! is never modified and the output keeps the input order.
//!
//! | form value          | mode                                | fields consulted          |
//! |---------------------|-------------------------------------|---------------------------|
//! | `all` / unknown     | [`FilterMode::All`]                 | none                      |
//! | `registration_date` | [`FilterMode::RegistrationDate`]    | `start_date`, `end_date`  |
//! | `client_type`       | [`FilterMode::ClientType`]          | `client_type`             |
//! | `spend`             | [`FilterMode::Spend`]               | `min_spend`, `max_spend`  |
//! | `surname`           | [`FilterMode::Surname`]             | `surname`                 |

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use tienda_core::{Amount, ClientTypeId};

use crate::models::Client;

/// Date format submitted by `<input type="date">`.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Closed set of filter modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    All,
    RegistrationDate,
    ClientType,
    Spend,
    Surname,
}

impl FilterMode {
    /// All modes, in the order the listing offers them.
    pub const ALL: [Self; 5] = [
        Self::All,
        Self::RegistrationDate,
        Self::ClientType,
        Self::Spend,
        Self::Surname,
    ];

    /// Mode for a submitted selector; unknown or absent values select `All`.
    #[must_use]
    pub fn from_form(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("registration_date") => Self::RegistrationDate,
            Some("client_type") => Self::ClientType,
            Some("spend") => Self::Spend,
            Some("surname") => Self::Surname,
            _ => Self::All,
        }
    }

    /// Form value for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::RegistrationDate => "registration_date",
            Self::ClientType => "client_type",
            Self::Spend => "spend",
            Self::Surname => "surname",
        }
    }

    /// Label shown next to the selector.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "Show all",
            Self::RegistrationDate => "Registration date",
            Self::ClientType => "Client type",
            Self::Spend => "Spend",
            Self::Surname => "Surname",
        }
    }
}

/// Raw filter submission from the client listing form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterForm {
    pub mode: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub client_type: Option<String>,
    pub min_spend: Option<String>,
    pub max_spend: Option<String>,
    pub surname: Option<String>,
}

/// A filter criterion that could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("{field} must be a date (YYYY-MM-DD), got '{value}'")]
    InvalidDate { field: &'static str, value: String },

    #[error("{field} must be a non-negative amount, got '{value}'")]
    InvalidAmount { field: &'static str, value: String },

    #[error("'{0}' is not a valid client type")]
    InvalidClientType(String),
}

/// A parsed, ready-to-apply filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClientFilter {
    #[default]
    All,
    /// Inclusive registration date range; either bound optional.
    RegistrationDate {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    /// Exact client type.
    ClientType(ClientTypeId),
    /// Inclusive spend range; either bound optional.
    Spend {
        min: Option<Amount>,
        max: Option<Amount>,
    },
    /// Case-insensitive surname substring, stored lower-cased.
    Surname(String),
}

impl ClientFilter {
    /// Build a filter from a form submission.
    ///
    /// Only the fields of the selected mode are read. Blank fields are not
    /// applied, and a mode whose fields are all blank becomes [`Self::All`].
    ///
    /// # Errors
    ///
    /// Returns `FilterError` when a consulted field is present but unparsable.
    pub fn from_form(form: &FilterForm) -> Result<Self, FilterError> {
        let filter = match FilterMode::from_form(form.mode.as_deref()) {
            FilterMode::All => Self::All,
            FilterMode::RegistrationDate => {
                let start = parse_date("start_date", form.start_date.as_deref())?;
                let end = parse_date("end_date", form.end_date.as_deref())?;
                if start.is_none() && end.is_none() {
                    Self::All
                } else {
                    Self::RegistrationDate { start, end }
                }
            }
            FilterMode::ClientType => match non_blank(form.client_type.as_deref()) {
                Some(raw) => Self::ClientType(
                    raw.parse::<ClientTypeId>()
                        .map_err(|_| FilterError::InvalidClientType(raw.to_owned()))?,
                ),
                None => Self::All,
            },
            FilterMode::Spend => {
                let min = parse_amount("min_spend", form.min_spend.as_deref())?;
                let max = parse_amount("max_spend", form.max_spend.as_deref())?;
                if min.is_none() && max.is_none() {
                    Self::All
                } else {
                    Self::Spend { min, max }
                }
            }
            FilterMode::Surname => match non_blank(form.surname.as_deref()) {
                Some(raw) => Self::Surname(raw.to_lowercase()),
                None => Self::All,
            },
        };
        Ok(filter)
    }

    /// Whether a client satisfies this filter.
    #[must_use]
    pub fn matches(&self, client: &Client) -> bool {
        match self {
            Self::All => true,
            Self::RegistrationDate { start, end } => within(client.registered_on, *start, *end),
            Self::ClientType(id) => client.client_type == *id,
            Self::Spend { min, max } => within(client.spend, *min, *max),
            Self::Surname(needle) => client.surname.to_lowercase().contains(needle.as_str()),
        }
    }
}

/// Apply a filter, keeping the input order.
#[must_use]
pub fn filter_clients(clients: &[Client], filter: &ClientFilter) -> Vec<Client> {
    clients
        .iter()
        .filter(|c| filter.matches(c))
        .cloned()
        .collect()
}

fn within<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    min.is_none_or(|lo| value >= lo) && max.is_none_or(|hi| value <= hi)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(field: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, FilterError> {
    non_blank(value)
        .map(|raw| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| FilterError::InvalidDate {
                field,
                value: raw.to_owned(),
            })
        })
        .transpose()
}

fn parse_amount(field: &'static str, value: Option<&str>) -> Result<Option<Amount>, FilterError> {
    non_blank(value)
        .map(|raw| {
            Amount::parse(raw).map_err(|_| FilterError::InvalidAmount {
                field,
                value: raw.to_owned(),
            })
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tienda_core::UserId;

    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn client(surname: &str, registered_on: &str, client_type: i32, spend: u32) -> Client {
        let mut c = Client::new(
            UserId::generate(),
            "Test".to_owned(),
            surname.to_owned(),
            ClientTypeId::new(client_type),
            date(registered_on),
        );
        c.spend = Amount::from_cents(spend * 100);
        c
    }

    fn sample() -> Vec<Client> {
        vec![
            client("Lopez", "2021-05-01", 1, 50),
            client("Diaz", "2022-01-10", 2, 120),
        ]
    }

    fn form(mode: &str) -> FilterForm {
        FilterForm {
            mode: Some(mode.to_owned()),
            ..FilterForm::default()
        }
    }

    fn surnames(clients: &[Client]) -> Vec<&str> {
        clients.iter().map(|c| c.surname.as_str()).collect()
    }

    #[test]
    fn test_spend_range() {
        let filter = ClientFilter::from_form(&FilterForm {
            min_spend: Some("0".to_owned()),
            max_spend: Some("100".to_owned()),
            ..form("spend")
        })
        .unwrap();

        assert_eq!(surnames(&filter_clients(&sample(), &filter)), ["Lopez"]);
    }

    #[test]
    fn test_surname_substring_ignores_case() {
        let filter = ClientFilter::from_form(&FilterForm {
            surname: Some("ope".to_owned()),
            ..form("surname")
        })
        .unwrap();
        assert_eq!(surnames(&filter_clients(&sample(), &filter)), ["Lopez"]);

        let filter = ClientFilter::from_form(&FilterForm {
            surname: Some(" DÍ".to_owned()),
            ..form("surname")
        })
        .unwrap();
        let clients = vec![client("Díaz", "2022-01-10", 2, 120)];
        assert_eq!(surnames(&filter_clients(&clients, &filter)), ["Díaz"]);
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let filter = ClientFilter::from_form(&FilterForm {
            start_date: Some("2021-05-01".to_owned()),
            end_date: Some("2022-01-10".to_owned()),
            ..form("registration_date")
        })
        .unwrap();
        assert_eq!(
            surnames(&filter_clients(&sample(), &filter)),
            ["Lopez", "Diaz"]
        );

        let filter = ClientFilter::from_form(&FilterForm {
            start_date: Some("2021-05-02".to_owned()),
            ..form("registration_date")
        })
        .unwrap();
        assert_eq!(surnames(&filter_clients(&sample(), &filter)), ["Diaz"]);
    }

    #[test]
    fn test_client_type_exact_match() {
        let filter = ClientFilter::from_form(&FilterForm {
            client_type: Some("2".to_owned()),
            ..form("client_type")
        })
        .unwrap();
        assert_eq!(surnames(&filter_clients(&sample(), &filter)), ["Diaz"]);
    }

    #[test]
    fn test_unknown_mode_shows_all() {
        let input = sample();
        for mode in ["all", "numeric-range", ""] {
            let filter = ClientFilter::from_form(&FilterForm {
                min_spend: Some("1000".to_owned()),
                ..form(mode)
            })
            .unwrap();
            assert_eq!(filter, ClientFilter::All);
            assert_eq!(filter_clients(&input, &filter), input);
        }
        assert_eq!(
            ClientFilter::from_form(&FilterForm::default()).unwrap(),
            ClientFilter::All
        );
    }

    #[test]
    fn test_blank_fields_are_not_applied() {
        let filter = ClientFilter::from_form(&FilterForm {
            min_spend: Some("  ".to_owned()),
            max_spend: Some("100".to_owned()),
            ..form("spend")
        })
        .unwrap();
        assert_eq!(
            filter,
            ClientFilter::Spend {
                min: None,
                max: Some(Amount::from_cents(10_000)),
            }
        );

        let filter = ClientFilter::from_form(&form("surname")).unwrap();
        assert_eq!(filter, ClientFilter::All);
    }

    #[test]
    fn test_fields_of_other_modes_are_ignored() {
        let filter = ClientFilter::from_form(&FilterForm {
            surname: Some("zzz".to_owned()),
            start_date: Some("not a date".to_owned()),
            client_type: Some("1".to_owned()),
            ..form("client_type")
        })
        .unwrap();
        assert_eq!(filter, ClientFilter::ClientType(ClientTypeId::new(1)));
    }

    #[test]
    fn test_unparsable_bounds_are_rejected() {
        let err = ClientFilter::from_form(&FilterForm {
            min_spend: Some("ten".to_owned()),
            ..form("spend")
        })
        .unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidAmount {
                field: "min_spend",
                value: "ten".to_owned()
            }
        );

        assert!(
            ClientFilter::from_form(&FilterForm {
                max_spend: Some("-5".to_owned()),
                ..form("spend")
            })
            .is_err()
        );
        assert!(
            ClientFilter::from_form(&FilterForm {
                end_date: Some("01/10/2022".to_owned()),
                ..form("registration_date")
            })
            .is_err()
        );
        assert!(
            ClientFilter::from_form(&FilterForm {
                client_type: Some("premium".to_owned()),
                ..form("client_type")
            })
            .is_err()
        );
    }

    #[test]
    fn test_inverted_range_matches_nothing() {
        let filter = ClientFilter::from_form(&FilterForm {
            min_spend: Some("100".to_owned()),
            max_spend: Some("10".to_owned()),
            ..form("spend")
        })
        .unwrap();
        assert!(filter_clients(&sample(), &filter).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent_and_pure() {
        let input = sample();
        let snapshot = input.clone();
        let filter = ClientFilter::Surname("z".to_owned());

        let once = filter_clients(&input, &filter);
        let twice = filter_clients(&once, &filter);

        assert_eq!(once, twice);
        assert_eq!(input, snapshot);
    }

    #[test]
    fn test_mode_form_values() {
        for mode in FilterMode::ALL {
            assert_eq!(FilterMode::from_form(Some(mode.as_str())), mode);
        }
        assert_eq!(FilterMode::from_form(None), FilterMode::All);
    }
}
