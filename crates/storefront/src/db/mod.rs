//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `tienda`
//!
//! ## Tables
//!
//! - `user_account` - Customer/employee credentials and block status
//! - `password_recovery` - Recovery question and hashed answer per user
//! - `administrator` - Administrator credentials
//! - `client` - Client profile, one per user
//! - `client_type`, `block_reason`, `recovery_question` - Seeded catalogs
//! - `tower_sessions.session` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p tienda-cli -- migrate
//! ```
//!
//! Every repository is a trait with a `PostgreSQL` implementation and an
//! in-memory implementation in [`memory`], so handlers never see a concrete
//! backend.

pub mod administrators;
pub mod catalog;
pub mod clients;
pub mod memory;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use administrators::{AdministratorRepository, PgAdministratorRepository};
pub use catalog::{CatalogRepository, PgCatalogRepository};
pub use clients::{ClientRepository, PgClientRepository};
pub use memory::InMemoryStore;
pub use users::{PgUserRepository, UserRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-violation into `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// The set of repositories handlers work against.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub administrators: Arc<dyn AdministratorRepository>,
    pub clients: Arc<dyn ClientRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
}

impl Repositories {
    /// Repositories backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            administrators: Arc::new(PgAdministratorRepository::new(pool.clone())),
            clients: Arc::new(PgClientRepository::new(pool.clone())),
            catalog: Arc::new(PgCatalogRepository::new(pool.clone())),
        }
    }

    /// Repositories backed by a single in-memory store.
    #[must_use]
    pub fn in_memory(store: &InMemoryStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            administrators: Arc::new(store.clone()),
            clients: Arc::new(store.clone()),
            catalog: Arc::new(store.clone()),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
