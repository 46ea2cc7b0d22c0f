//! User authentication route handlers.
//!
//! Registration, the two-step email/password login, and password recovery.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use tienda_core::{Email, PrincipalKind};

use super::views::{OptionView, recovery_question_options};
use super::{ACCOUNT_PATH, INVALID_CREDENTIALS};
use crate::error::{Result, breadcrumb, track_principal};
use crate::middleware::{SessionContext, USER_PASSWORD_PATH};
use crate::models::{CurrentUser, Flash, RecoveryQuestion};
use crate::services::auth::{AuthError, RecoveryInput, RegistrationInput};
use crate::session::UserLogin;
use crate::state::AppState;

const RECOVER_PATH: &str = "/auth/recover";

// =============================================================================
// Form Types
// =============================================================================

/// Email step form data (login and recovery).
#[derive(Debug, Deserialize)]
pub struct EmailForm {
    pub email: String,
}

/// Password step form data.
#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Email page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub flash: Option<Flash>,
    pub errors: Vec<String>,
    pub email: String,
}

/// Password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/password.html")]
pub struct PasswordTemplate {
    pub flash: Option<Flash>,
    pub email: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub errors: Vec<String>,
    pub email: String,
    pub questions: Vec<OptionView>,
}

/// Recovery email page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/recover.html")]
pub struct RecoverTemplate {
    pub flash: Option<Flash>,
    pub email: String,
}

/// Recovery answer page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/recover_answer.html")]
pub struct RecoverAnswerTemplate {
    pub errors: Vec<String>,
    pub email: String,
    pub question: String,
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    State(state): State<AppState>,
    mut ctx: SessionContext,
) -> Result<Response> {
    let questions = recovery_question_options(ctx.recovery_questions(state.catalog()).await?, "");
    ctx.save().await?;

    Ok(RegisterTemplate {
        errors: Vec::new(),
        email: String::new(),
        questions,
    }
    .into_response())
}

/// Handle registration form submission.
pub async fn register(
    State(state): State<AppState>,
    mut ctx: SessionContext,
    Form(input): Form<RegistrationInput>,
) -> Result<Response> {
    let questions = ctx.recovery_questions(state.catalog()).await?.to_vec();

    match state.auth().register_user(&input, &questions).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "User registered");
            ctx.set_flash(Flash::Success(
                "Account created. Log in to continue.".to_owned(),
            ));
            ctx.save().await?;
            Ok(Redirect::to(PrincipalKind::User.login_path()).into_response())
        }
        Err(AuthError::Validation(errors)) => {
            ctx.save().await?;
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                RegisterTemplate {
                    errors: errors.messages().to_vec(),
                    email: input.email,
                    questions: recovery_question_options(&questions, &input.recovery_question),
                },
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the email page.
pub async fn login_page(mut ctx: SessionContext) -> Result<Response> {
    if ctx.current_user().is_some() {
        return Ok(Redirect::to(ACCOUNT_PATH).into_response());
    }

    let flash = ctx.take_flash();
    let email = ctx
        .captured_email()
        .map(ToString::to_string)
        .unwrap_or_default();
    ctx.save().await?;

    Ok(LoginTemplate {
        flash,
        errors: Vec::new(),
        email,
    }
    .into_response())
}

/// Handle the email step: remember the email and ask for the password.
pub async fn login(mut ctx: SessionContext, Form(form): Form<EmailForm>) -> Result<Response> {
    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                LoginTemplate {
                    flash: None,
                    errors: vec![format!("Email: {e}")],
                    email: form.email,
                },
            )
                .into_response());
        }
    };

    if !ctx.capture_email(email) {
        return Ok(Redirect::to(ACCOUNT_PATH).into_response());
    }
    ctx.save().await?;

    Ok(Redirect::to(USER_PASSWORD_PATH).into_response())
}

/// Display the password page for the captured email.
pub async fn password_page(mut ctx: SessionContext) -> Result<Response> {
    let email = match ctx.user_login() {
        UserLogin::Anonymous => {
            return Ok(Redirect::to(PrincipalKind::User.login_path()).into_response());
        }
        UserLogin::Authenticated { .. } => return Ok(Redirect::to(ACCOUNT_PATH).into_response()),
        UserLogin::EmailCaptured { email } => email.to_string(),
    };

    let flash = ctx.take_flash();
    ctx.save().await?;

    Ok(PasswordTemplate { flash, email }.into_response())
}

/// Handle the password step.
///
/// On failure the captured email is kept, so the user goes back to the email
/// page with it pre-filled and a generic message.
pub async fn password(
    State(state): State<AppState>,
    mut ctx: SessionContext,
    Form(form): Form<PasswordForm>,
) -> Result<Response> {
    let email = match ctx.user_login() {
        UserLogin::Anonymous => {
            return Ok(Redirect::to(PrincipalKind::User.login_path()).into_response());
        }
        UserLogin::Authenticated { .. } => return Ok(Redirect::to(ACCOUNT_PATH).into_response()),
        UserLogin::EmailCaptured { email } => email.clone(),
    };

    match state.auth().login_user(email.as_str(), &form.password).await {
        Ok(user) => {
            ctx.cycle_id().await?;
            ctx.set_current_user(CurrentUser::from(&user));
            ctx.save().await?;

            track_principal(PrincipalKind::User, &user.id, &user.email);
            breadcrumb("auth", "User logged in", &[]);
            tracing::info!(user_id = %user.id, "User logged in");

            Ok(Redirect::to(ACCOUNT_PATH).into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!("User login failed");
            ctx.set_flash(Flash::Error(INVALID_CREDENTIALS.to_owned()));
            ctx.save().await?;
            Ok(Redirect::to(PrincipalKind::User.login_path()).into_response())
        }
        Err(AuthError::Blocked) => {
            tracing::warn!("Blocked user attempted login");
            ctx.set_flash(Flash::Error("This account has been suspended".to_owned()));
            ctx.save().await?;
            Ok(Redirect::to(PrincipalKind::User.login_path()).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Password Recovery Routes
// =============================================================================

/// Display the recovery email page.
pub async fn recover_page(mut ctx: SessionContext) -> Result<Response> {
    let flash = ctx.take_flash();
    let email = ctx
        .captured_email()
        .map(ToString::to_string)
        .unwrap_or_default();
    ctx.save().await?;

    Ok(RecoverTemplate { flash, email }.into_response())
}

/// Show the recovery question registered for an email.
pub async fn recover(
    State(state): State<AppState>,
    mut ctx: SessionContext,
    Form(form): Form<EmailForm>,
) -> Result<Response> {
    let question = recovery_prompt(&state, &mut ctx, &form.email).await?;
    ctx.save().await?;

    Ok(RecoverAnswerTemplate {
        errors: Vec::new(),
        email: form.email.trim().to_owned(),
        question,
    }
    .into_response())
}

/// Check the recovery answer and set the new password.
pub async fn recover_answer(
    State(state): State<AppState>,
    mut ctx: SessionContext,
    Form(input): Form<RecoveryInput>,
) -> Result<Response> {
    match state.auth().recover_password(&input).await {
        Ok(()) => {
            ctx.set_flash(Flash::Success(
                "Password updated. Log in with your new password.".to_owned(),
            ));
            ctx.save().await?;
            Ok(Redirect::to(PrincipalKind::User.login_path()).into_response())
        }
        Err(AuthError::Validation(errors)) => {
            let question = recovery_prompt(&state, &mut ctx, &input.email).await?;
            ctx.save().await?;

            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                RecoverAnswerTemplate {
                    errors: errors.messages().to_vec(),
                    email: input.email,
                    question,
                },
            )
                .into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!("Password recovery failed");
            ctx.set_flash(Flash::Error(
                "The recovery answer is incorrect".to_owned(),
            ));
            ctx.save().await?;
            Ok(Redirect::to(RECOVER_PATH).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Question text to ask for an email.
///
/// An email without an account gets a stand-in question picked from the
/// catalog, stable per address, and then fails at the answer step like a
/// wrong answer does.
async fn recovery_prompt(
    state: &AppState,
    ctx: &mut SessionContext,
    email: &str,
) -> Result<String> {
    let registered = match state.auth().recovery_question(email).await {
        Ok(id) => Some(id),
        Err(AuthError::InvalidCredentials) => None,
        Err(e) => return Err(e.into()),
    };

    let question = match registered {
        Some(id) => ctx
            .recovery_question_map(state.catalog())
            .await?
            .remove(&id),
        None => stand_in_question(email, ctx.recovery_questions(state.catalog()).await?)
            .map(|q| q.question.clone()),
    };

    Ok(question.unwrap_or_default())
}

fn stand_in_question<'a>(
    email: &str,
    questions: &'a [RecoveryQuestion],
) -> Option<&'a RecoveryQuestion> {
    let seed = email
        .trim()
        .to_lowercase()
        .bytes()
        .fold(0_usize, |acc, b| acc.wrapping_mul(31).wrapping_add(usize::from(b)));
    questions.get(seed % questions.len().max(1))
}
