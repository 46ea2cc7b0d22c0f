//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! tienda-cli migrate
//! ```
//!
//! Applies `crates/storefront/migrations/` and creates the session table used
//! by the storefront's `PostgreSQL` session store.
//!
//! # Environment Variables
//!
//! - `TIENDA_DATABASE_URL` - `PostgreSQL` connection string (or `DATABASE_URL`)

use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, database_url};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run every migration.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = tienda_storefront::db::create_pool(&database_url).await?;

    tracing::info!("Running schema migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
