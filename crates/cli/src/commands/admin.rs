//! Administrator management commands.
//!
//! # Usage
//!
//! ```bash
//! tienda-cli admin create -e admin@example.com -p 'a long password'
//! ```
//!
//! # Environment Variables
//!
//! - `TIENDA_DATABASE_URL` - `PostgreSQL` connection string (or `DATABASE_URL`)

use thiserror::Error;

use tienda_storefront::db::Repositories;
use tienda_storefront::services::{AuthError, AuthService};

use super::{CommandError, database_url};

/// Errors that can occur during administrator operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Administrator already exists with email: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    Auth(AuthError),
}

/// Create a new administrator.
///
/// # Arguments
///
/// * `email` - Administrator's email address
/// * `password` - Administrator's password
pub async fn create(email: &str, password: &str) -> Result<(), AdminError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = tienda_storefront::db::create_pool(&database_url).await?;
    let repositories = Repositories::postgres(&pool);

    tracing::info!("Creating administrator: {}", email);
    let admin = AuthService::new(
        repositories.users.as_ref(),
        repositories.administrators.as_ref(),
    )
    .create_administrator(email, password)
    .await
    .map_err(|e| match e {
        AuthError::AlreadyExists => AdminError::AlreadyExists(email.to_owned()),
        other => AdminError::Auth(other),
    })?;

    tracing::info!(
        "Administrator created successfully! ID: {}, Email: {}",
        admin.id,
        admin.email
    );

    Ok(())
}
