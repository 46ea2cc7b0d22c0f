//! Account route handlers.
//!
//! The personal area. Every page except logout requires an authenticated user,
//! and a user without a client profile is sent to create one first.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;

use tienda_core::ClientTypeId;

use super::ACCOUNT_PATH;
use super::views::{ClientView, OptionView, client_type_options, client_views};
use crate::error::{Result, forget_principal};
use crate::middleware::{RequireUser, SessionContext, USER_PASSWORD_PATH};
use crate::models::{Client, ClientType, Flash};
use crate::services::ValidationErrors;
use crate::state::AppState;

const PROFILE_PATH: &str = "/account/profile";

/// Client profile form data.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    pub first_name: String,
    pub surname: String,
    pub client_type: String,
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub flash: Option<Flash>,
    pub email: String,
    pub client: ClientView,
}

/// Client profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub errors: Vec<String>,
    pub email: String,
    pub first_name: String,
    pub surname: String,
    pub client_types: Vec<OptionView>,
}

/// Display the personal area.
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    mut ctx: SessionContext,
) -> Result<Response> {
    let Some(client) = state.clients().find_by_user(user.id).await? else {
        return Ok(Redirect::to(PROFILE_PATH).into_response());
    };

    let types = ctx.client_types(state.catalog()).await?;
    let Some(client) = client_views(&[client], types).pop() else {
        return Ok(Redirect::to(PROFILE_PATH).into_response());
    };
    let flash = ctx.take_flash();
    ctx.save().await?;

    Ok(AccountIndexTemplate {
        flash,
        email: user.email.to_string(),
        client,
    }
    .into_response())
}

/// Log the user out.
///
/// The email stays captured, so the next login starts at the password page.
/// An administrator logged in on the same session is not affected.
pub async fn logout(mut ctx: SessionContext) -> Result<Redirect> {
    if let Some(user) = ctx.current_user() {
        tracing::info!(user_id = %user.id, "User logged out");
    }
    ctx.clear_current_user();
    ctx.save().await?;
    forget_principal();

    Ok(Redirect::to(USER_PASSWORD_PATH))
}

/// Display the client profile form.
pub async fn profile_page(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    mut ctx: SessionContext,
) -> Result<Response> {
    if state.clients().find_by_user(user.id).await?.is_some() {
        return Ok(Redirect::to(ACCOUNT_PATH).into_response());
    }

    let client_types = client_type_options(ctx.client_types(state.catalog()).await?, "");
    ctx.save().await?;

    Ok(ProfileTemplate {
        errors: Vec::new(),
        email: user.email.to_string(),
        first_name: String::new(),
        surname: String::new(),
        client_types,
    }
    .into_response())
}

/// Create the client profile.
pub async fn create_profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    mut ctx: SessionContext,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    if state.clients().find_by_user(user.id).await?.is_some() {
        return Ok(Redirect::to(ACCOUNT_PATH).into_response());
    }

    let types = ctx.client_types(state.catalog()).await?.to_vec();
    let client_type = match validate_profile(&form, &types) {
        Ok(client_type) => client_type,
        Err(errors) => {
            ctx.save().await?;
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                ProfileTemplate {
                    errors: errors.messages().to_vec(),
                    email: user.email.to_string(),
                    client_types: client_type_options(&types, &form.client_type),
                    first_name: form.first_name,
                    surname: form.surname,
                },
            )
                .into_response());
        }
    };

    let client = Client::new(
        user.id,
        form.first_name.trim().to_owned(),
        form.surname.trim().to_owned(),
        client_type,
        Utc::now().date_naive(),
    );
    let client = state.clients().save(&client).await?;
    tracing::info!(user_id = %user.id, client_id = %client.id, "Client profile created");

    ctx.invalidate_clients();
    ctx.set_flash(Flash::Success("Profile saved".to_owned()));
    ctx.save().await?;

    Ok(Redirect::to(ACCOUNT_PATH).into_response())
}

/// Check a profile form, returning the chosen client type.
fn validate_profile(
    form: &ProfileForm,
    types: &[ClientType],
) -> std::result::Result<ClientTypeId, ValidationErrors> {
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

    errors.into_result()?;
    client_type.ok_or_else(ValidationErrors::new)
}
