//! Administrator repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tienda_core::{AdministratorId, Email};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Administrator;

/// Persistence operations on administrators.
#[async_trait]
pub trait AdministratorRepository: Send + Sync {
    /// An administrator and their password hash, by email.
    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(Administrator, String)>, RepositoryError>;

    /// Create an administrator.
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    async fn create(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<Administrator, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct AdministratorRow {
    id: AdministratorId,
    email: Email,
    created_at: DateTime<Utc>,
}

impl From<AdministratorRow> for Administrator {
    fn from(row: AdministratorRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    admin: AdministratorRow,
    password_hash: String,
}

/// `PostgreSQL` administrator repository.
pub struct PgAdministratorRepository {
    pool: PgPool,
}

impl PgAdministratorRepository {
    /// Create a new administrator repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdministratorRepository for PgAdministratorRepository {
    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(Administrator, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, email, created_at, password_hash
            FROM tienda.administrator
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| (Administrator::from(r.admin), r.password_hash)))
    }

    async fn create(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<Administrator, RepositoryError> {
        let row = sqlx::query_as::<_, AdministratorRow>(
            r"
            INSERT INTO tienda.administrator (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, created_at
            ",
        )
        .bind(AdministratorId::generate())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "administrator"))?;

        tracing::info!(admin_id = %row.id, "Created administrator");
        Ok(Administrator::from(row))
    }
}
