//! Display data shared by several templates.

use std::collections::HashMap;

use tienda_core::{BlockReasonId, ClientTypeId};

use crate::models::{BlockReason, Client, ClientType, RecoveryQuestion, User};

/// Date format used on every page.
const DATE_FORMAT: &str = "%d/%m/%Y";

/// One `<option>` of a `<select>`.
#[derive(Clone)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl OptionView {
    fn new(value: impl ToString, label: &str, selected: bool) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_owned(),
            selected,
        }
    }
}

/// Client display data for templates.
#[derive(Clone)]
pub struct ClientView {
    pub id: String,
    pub first_name: String,
    pub surname: String,
    pub client_type: String,
    pub registered_on: String,
    pub spend: String,
}

/// User display data for templates.
#[derive(Clone)]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub created_at: String,
    pub blocked: bool,
    pub status: String,
}

pub fn client_type_options(types: &[ClientType], selected: &str) -> Vec<OptionView> {
    types
        .iter()
        .map(|t| OptionView::new(t.id, &t.name, t.id.to_string() == selected.trim()))
        .collect()
}

pub fn recovery_question_options(
    questions: &[RecoveryQuestion],
    selected: &str,
) -> Vec<OptionView> {
    questions
        .iter()
        .map(|q| OptionView::new(q.id, &q.question, q.id.to_string() == selected.trim()))
        .collect()
}

pub fn block_reason_options(
    reasons: &[BlockReason],
    selected: Option<BlockReasonId>,
) -> Vec<OptionView> {
    reasons
        .iter()
        .map(|r| OptionView::new(r.id, &r.name, Some(r.id) == selected))
        .collect()
}

/// Map clients to display rows, resolving client type names.
pub fn client_views(clients: &[Client], types: &[ClientType]) -> Vec<ClientView> {
    let names: HashMap<ClientTypeId, &str> =
        types.iter().map(|t| (t.id, t.name.as_str())).collect();

    clients
        .iter()
        .map(|c| ClientView {
            id: c.id.to_string(),
            first_name: c.first_name.clone(),
            surname: c.surname.clone(),
            client_type: names
                .get(&c.client_type)
                .map_or_else(|| c.client_type.to_string(), |n| (*n).to_owned()),
            registered_on: c.registered_on.format(DATE_FORMAT).to_string(),
            spend: c.spend.to_string(),
        })
        .collect()
}

/// Map users to display rows, resolving block reason names.
pub fn user_views(users: &[User], reasons: &[BlockReason]) -> Vec<UserView> {
    users
        .iter()
        .map(|u| {
            let status = match u.block_reason {
                None => "Active".to_owned(),
                Some(id) => reasons
                    .iter()
                    .find(|r| r.id == id)
                    .map_or_else(|| "Blocked".to_owned(), |r| format!("Blocked: {}", r.name)),
            };
            UserView {
                id: u.id.to_string(),
                email: u.email.to_string(),
                created_at: u.created_at.format(DATE_FORMAT).to_string(),
                blocked: u.is_blocked(),
                status,
            }
        })
        .collect()
}
