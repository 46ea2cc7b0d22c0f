//! Administration route handlers.
//!
//! Every page except the login page requires an authenticated administrator.
//! The administrator session is independent of any user logged in on the same
//! browser.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use tienda_core::{Amount, BlockReasonId, ClientId, ClientTypeId, PrincipalKind, UserId};

use super::INVALID_CREDENTIALS;
use super::views::{
    ClientView, OptionView, UserView, block_reason_options, client_type_options, client_views,
    user_views,
};
use crate::error::{Result, breadcrumb, forget_principal, track_principal};
use crate::middleware::{RequireAdministrator, SessionContext};
use crate::models::{BlockReason, Client, ClientType, CurrentAdministrator, Flash};
use crate::services::auth::AuthError;
use crate::services::{
    ClientFilter, FilterForm, FilterMode, ValidationErrors, filter_clients as apply_filter,
};
use crate::state::AppState;

const DASHBOARD_PATH: &str = "/admin";
const USERS_PATH: &str = "/admin/users";
const CLIENTS_PATH: &str = "/admin/clients";

// =============================================================================
// Form Types
// =============================================================================

/// Administrator login form data.
#[derive(Debug, Deserialize)]
pub struct AdminLoginForm {
    pub email: String,
    pub password: String,
}

/// Block form data; an empty reason unblocks the user.
#[derive(Debug, Deserialize)]
pub struct BlockForm {
    #[serde(default)]
    pub block_reason: String,
}

/// Client edit form data.
#[derive(Debug, Default, Deserialize)]
pub struct ClientEditForm {
    pub first_name: String,
    pub surname: String,
    pub client_type: String,
    pub spend: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Administrator login page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct AdminLoginTemplate {
    pub flash: Option<Flash>,
}

/// Administration dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminIndexTemplate {
    pub email: String,
}

/// User listing template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub flash: Option<Flash>,
    pub users: Vec<UserView>,
}

/// Block form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/block.html")]
pub struct BlockTemplate {
    pub errors: Vec<String>,
    pub user: UserView,
    pub reasons: Vec<OptionView>,
}

/// Filter mode option for the client listing.
pub struct ModeView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Client listing template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/clients.html")]
pub struct ClientsTemplate {
    pub flash: Option<Flash>,
    pub error: Option<String>,
    pub modes: Vec<ModeView>,
    pub client_types: Vec<OptionView>,
    pub form: FilterForm,
    pub clients: Vec<ClientView>,
}

/// Client detail template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/client.html")]
pub struct ClientTemplate {
    pub client: ClientView,
}

/// Client edit template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/client_edit.html")]
pub struct ClientEditTemplate {
    pub errors: Vec<String>,
    pub id: String,
    pub first_name: String,
    pub surname: String,
    pub spend: String,
    pub client_types: Vec<OptionView>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the administrator login page.
pub async fn login_page(mut ctx: SessionContext) -> Result<Response> {
    if ctx.current_administrator().is_some() {
        return Ok(Redirect::to(DASHBOARD_PATH).into_response());
    }

    let flash = ctx.take_flash();
    ctx.save().await?;

    Ok(AdminLoginTemplate { flash }.into_response())
}

/// Handle administrator login.
///
/// A failed attempt leaves any current administrator in place.
pub async fn login(
    State(state): State<AppState>,
    mut ctx: SessionContext,
    Form(form): Form<AdminLoginForm>,
) -> Result<Redirect> {
    match state
        .auth()
        .login_administrator(&form.email, &form.password)
        .await
    {
        Ok(admin) => {
            ctx.cycle_id().await?;
            ctx.set_current_administrator(CurrentAdministrator::from(&admin));
            ctx.save().await?;

            track_principal(PrincipalKind::Administrator, &admin.id, &admin.email);
            breadcrumb("auth", "Administrator logged in", &[]);
            tracing::info!(admin_id = %admin.id, "Administrator logged in");

            Ok(Redirect::to(DASHBOARD_PATH))
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!("Administrator login failed");
            ctx.set_flash(Flash::Error(INVALID_CREDENTIALS.to_owned()));
            ctx.save().await?;
            Ok(Redirect::to(PrincipalKind::Administrator.login_path()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Log the administrator out; a logged-in user on the same session stays.
pub async fn logout(mut ctx: SessionContext) -> Result<Redirect> {
    if let Some(admin) = ctx.current_administrator() {
        tracing::info!(admin_id = %admin.id, "Administrator logged out");
    }
    ctx.clear_current_administrator();
    ctx.save().await?;
    forget_principal();

    Ok(Redirect::to(PrincipalKind::Administrator.login_path()))
}

/// Display the administration dashboard.
pub async fn index(RequireAdministrator(admin): RequireAdministrator) -> AdminIndexTemplate {
    AdminIndexTemplate {
        email: admin.email.to_string(),
    }
}

// =============================================================================
// User Routes
// =============================================================================

/// Display the user listing, reloading it from the database.
pub async fn users(
    State(state): State<AppState>,
    RequireAdministrator(_admin): RequireAdministrator,
    mut ctx: SessionContext,
) -> Result<UsersTemplate> {
    ctx.invalidate_users();
    let reasons = ctx.block_reasons(state.catalog()).await?.to_vec();
    let users = user_views(ctx.users(state.users()).await?, &reasons);
    let flash = ctx.take_flash();
    ctx.save().await?;

    Ok(UsersTemplate { flash, users })
}

/// Display the block form for one user.
pub async fn block_page(
    State(state): State<AppState>,
    RequireAdministrator(_admin): RequireAdministrator,
    mut ctx: SessionContext,
    Path(id): Path<String>,
) -> Result<Response> {
    let Some(user) = find_user(&state, &id).await? else {
        return Ok(Redirect::to(USERS_PATH).into_response());
    };

    let reasons = ctx.block_reasons(state.catalog()).await?.to_vec();
    ctx.save().await?;

    Ok(BlockTemplate {
        errors: Vec::new(),
        reasons: block_reason_options(&reasons, user.block_reason),
        user: first(user_views(&[user], &reasons))?,
    }
    .into_response())
}

/// Attach or clear a user's block reason.
pub async fn block(
    State(state): State<AppState>,
    RequireAdministrator(_admin): RequireAdministrator,
    mut ctx: SessionContext,
    Path(id): Path<String>,
    Form(form): Form<BlockForm>,
) -> Result<Response> {
    let Some(user) = find_user(&state, &id).await? else {
        return Ok(Redirect::to(USERS_PATH).into_response());
    };

    let reasons = ctx.block_reasons(state.catalog()).await?.to_vec();
    let reason = match parse_block_reason(&form.block_reason, &reasons) {
        Ok(reason) => reason,
        Err(message) => {
            ctx.save().await?;
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                BlockTemplate {
                    errors: vec![message],
                    reasons: block_reason_options(&reasons, user.block_reason),
                    user: first(user_views(&[user], &reasons))?,
                },
            )
                .into_response());
        }
    };

    match state.users().set_block_reason(user.id, reason).await {
        Ok(()) => {}
        Err(crate::db::RepositoryError::NotFound) => {
            return Ok(Redirect::to(USERS_PATH).into_response());
        }
        Err(e) => return Err(e.into()),
    }
    tracing::info!(user_id = %user.id, blocked = reason.is_some(), "User block status changed");

    ctx.invalidate_users();
    ctx.set_flash(Flash::Success(format!("Updated {}", user.email)));
    ctx.save().await?;

    Ok(Redirect::to(USERS_PATH).into_response())
}

// =============================================================================
// Client Routes
// =============================================================================

/// Display the client listing, reloading it from the database.
pub async fn clients(
    State(state): State<AppState>,
    RequireAdministrator(_admin): RequireAdministrator,
    mut ctx: SessionContext,
) -> Result<ClientsTemplate> {
    ctx.invalidate_clients();
    let types = ctx.client_types(state.catalog()).await?.to_vec();
    let clients = client_views(ctx.clients(state.clients()).await?, &types);
    let flash = ctx.take_flash();
    ctx.save().await?;

    Ok(clients_page(flash, None, FilterForm::default(), &types, clients))
}

/// Apply the parameterized filter to the client listing.
///
/// The filtered result replaces the session's client list. An unparsable
/// criterion re-renders the listing with the list left as it was.
pub async fn filter_clients(
    State(state): State<AppState>,
    RequireAdministrator(_admin): RequireAdministrator,
    mut ctx: SessionContext,
    Form(form): Form<FilterForm>,
) -> Result<Response> {
    let types = ctx.client_types(state.catalog()).await?.to_vec();

    let filter = match ClientFilter::from_form(&form) {
        Ok(filter) => filter,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected client filter");
            let clients = client_views(ctx.clients(state.clients()).await?, &types);
            ctx.save().await?;
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                clients_page(None, Some(e.to_string()), form, &types, clients),
            )
                .into_response());
        }
    };

    let all = state.clients().find_all().await?;
    let filtered = apply_filter(&all, &filter);
    breadcrumb(
        "admin",
        "Filtered clients",
        &[("mode", FilterMode::from_form(form.mode.as_deref()).as_str())],
    );

    let clients = client_views(&filtered, &types);
    ctx.set_clients(filtered);
    ctx.save().await?;

    Ok(clients_page(None, None, form, &types, clients).into_response())
}

/// Display one client.
pub async fn client_detail(
    State(state): State<AppState>,
    RequireAdministrator(_admin): RequireAdministrator,
    mut ctx: SessionContext,
    Path(id): Path<String>,
) -> Result<Response> {
    let Some(client) = find_client(&state, &id).await? else {
        return Ok(Redirect::to(CLIENTS_PATH).into_response());
    };

    let types = ctx.client_types(state.catalog()).await?.to_vec();
    ctx.save().await?;

    Ok(ClientTemplate {
        client: first(client_views(&[client], &types))?,
    }
    .into_response())
}

/// Display the client edit form.
pub async fn edit_client_page(
    State(state): State<AppState>,
    RequireAdministrator(_admin): RequireAdministrator,
    mut ctx: SessionContext,
    Path(id): Path<String>,
) -> Result<Response> {
    let Some(client) = find_client(&state, &id).await? else {
        return Ok(Redirect::to(CLIENTS_PATH).into_response());
    };

    let types = ctx.client_types(state.catalog()).await?;
    let client_types = client_type_options(types, &client.client_type.to_string());
    ctx.save().await?;

    Ok(ClientEditTemplate {
        errors: Vec::new(),
        id: client.id.to_string(),
        first_name: client.first_name,
        surname: client.surname,
        spend: client.spend.to_string(),
        client_types,
    }
    .into_response())
}

/// Save an edited client.
pub async fn edit_client(
    State(state): State<AppState>,
    RequireAdministrator(_admin): RequireAdministrator,
    mut ctx: SessionContext,
    Path(id): Path<String>,
    Form(form): Form<ClientEditForm>,
) -> Result<Response> {
    let Some(client) = find_client(&state, &id).await? else {
        return Ok(Redirect::to(CLIENTS_PATH).into_response());
    };

    let types = ctx.client_types(state.catalog()).await?.to_vec();
    let updated = match apply_client_edit(client, &form, &types) {
        Ok(updated) => updated,
        Err(errors) => {
            ctx.save().await?;
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                ClientEditTemplate {
                    errors: errors.messages().to_vec(),
                    id,
                    client_types: client_type_options(&types, &form.client_type),
                    first_name: form.first_name,
                    surname: form.surname,
                    spend: form.spend,
                },
            )
                .into_response());
        }
    };

    let saved = state.clients().save(&updated).await?;
    tracing::info!(client_id = %saved.id, "Client updated");

    ctx.invalidate_clients();
    ctx.set_flash(Flash::Success(format!("Saved {}", saved.full_name())));
    ctx.save().await?;

    Ok(Redirect::to(CLIENTS_PATH).into_response())
}

// =============================================================================
// Helper Functions
// =============================================================================

fn clients_page(
    flash: Option<Flash>,
    error: Option<String>,
    form: FilterForm,
    types: &[ClientType],
    clients: Vec<ClientView>,
) -> ClientsTemplate {
    let selected = FilterMode::from_form(form.mode.as_deref());
    ClientsTemplate {
        flash,
        error,
        modes: FilterMode::ALL
            .into_iter()
            .map(|mode| ModeView {
                value: mode.as_str(),
                label: mode.label(),
                selected: mode == selected,
            })
            .collect(),
        client_types: client_type_options(types, form.client_type.as_deref().unwrap_or_default()),
        form,
        clients,
    }
}

/// Look up a user from a path segment; malformed IDs are treated as unknown.
async fn find_user(state: &AppState, id: &str) -> Result<Option<crate::models::User>> {
    let Ok(id) = id.parse::<UserId>() else {
        return Ok(None);
    };
    Ok(state.users().find_by_id(id).await?)
}

/// Look up a client from a path segment; malformed IDs are treated as unknown.
async fn find_client(state: &AppState, id: &str) -> Result<Option<Client>> {
    let Ok(id) = id.parse::<ClientId>() else {
        return Ok(None);
    };
    Ok(state.clients().find_by_id(id).await?)
}

fn first<T>(views: Vec<T>) -> Result<T> {
    views
        .into_iter()
        .next()
        .ok_or_else(|| crate::error::AppError::Internal("empty view list".to_string()))
}

/// Parse the submitted block reason; blank means unblock.
fn parse_block_reason(
    raw: &str,
    reasons: &[BlockReason],
) -> std::result::Result<Option<BlockReasonId>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<BlockReasonId>()
        .ok()
        .filter(|id| reasons.iter().any(|r| r.id == *id))
        .map(Some)
        .ok_or_else(|| "Choose a block reason".to_owned())
}

/// Validate an edit form and apply it to a client.
fn apply_client_edit(
    client: Client,
    form: &ClientEditForm,
    types: &[ClientType],
) -> std::result::Result<Client, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.check(
        !form.first_name.trim().is_empty(),
        "First name is required",
    );
    errors.check(!form.surname.trim().is_empty(), "Surname is required");

    let client_type = form
        .client_type
        .parse::<ClientTypeId>()
        .ok()
        .filter(|id| types.iter().any(|t| t.id == *id));
    errors.check(client_type.is_some(), "Choose a client type");

    let spend = Amount::parse(&form.spend);
    if let Err(e) = &spend {
        errors.push(format!("Spend: {e}"));
    }

    errors.into_result()?;
    let (Some(client_type), Ok(spend)) = (client_type, spend) else {
        return Err(ValidationErrors::new());
    };

    Ok(Client {
        first_name: form.first_name.trim().to_owned(),
        surname: form.surname.trim().to_owned(),
        client_type,
        spend,
        ..client
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn types() -> Vec<ClientType> {
        vec![ClientType {
            id: ClientTypeId::new(1),
            code: "standard".to_owned(),
            name: "Standard".to_owned(),
        }]
    }

    fn client() -> Client {
        Client::new(
            UserId::generate(),
            "Ana".to_owned(),
            "Lopez".to_owned(),
            ClientTypeId::new(1),
            NaiveDate::from_ymd_opt(2021, 5, 1).unwrap(),
        )
    }

    #[test]
    fn test_apply_client_edit() {
        let original = client();
        let form = ClientEditForm {
            first_name: " Ana María ".to_owned(),
            surname: "López".to_owned(),
            client_type: "1".to_owned(),
            spend: "12,50".to_owned(),
        };

        let updated = apply_client_edit(original.clone(), &form, &types()).unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.registered_on, original.registered_on);
        assert_eq!(updated.first_name, "Ana María");
        assert_eq!(updated.spend, Amount::from_cents(1250));
    }

    #[test]
    fn test_apply_client_edit_collects_errors() {
        let form = ClientEditForm {
            spend: "-3".to_owned(),
            client_type: "9".to_owned(),
            ..ClientEditForm::default()
        };
        let errors = apply_client_edit(client(), &form, &types()).unwrap_err();
        assert_eq!(errors.messages().len(), 4);
    }

    #[test]
    fn test_apply_client_edit_rejects_spend_beyond_column() {
        let form = ClientEditForm {
            first_name: "Ana".to_owned(),
            surname: "Lopez".to_owned(),
            client_type: "1".to_owned(),
            spend: "100000000000".to_owned(),
        };
        let errors = apply_client_edit(client(), &form, &types()).unwrap_err();
        assert_eq!(
            errors.messages(),
            ["Spend: amount cannot exceed 9999999999.99"]
        );
    }

    #[test]
    fn test_parse_block_reason() {
        let reasons = vec![BlockReason {
            id: BlockReasonId::new(2),
            name: "Fraudulent activity".to_owned(),
        }];
        assert_eq!(parse_block_reason(" ", &reasons), Ok(None));
        assert_eq!(
            parse_block_reason("2", &reasons),
            Ok(Some(BlockReasonId::new(2)))
        );
        assert!(parse_block_reason("7", &reasons).is_err());
        assert!(parse_block_reason("x", &reasons).is_err());
    }
}
