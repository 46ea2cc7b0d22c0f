//! Client record repository.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use tienda_core::{Amount, ClientId, ClientTypeId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Client;

/// Persistence operations on client records.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// All clients, ordered by surname then first name.
    async fn find_all(&self) -> Result<Vec<Client>, RepositoryError>;

    /// A client by ID.
    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError>;

    /// The client record owned by a user.
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Client>, RepositoryError>;

    /// Insert or update a client record.
    async fn save(&self, client: &Client) -> Result<Client, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct ClientRow {
    id: ClientId,
    user_id: UserId,
    first_name: String,
    surname: String,
    client_type_id: ClientTypeId,
    registered_on: NaiveDate,
    spend: Amount,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            first_name: row.first_name,
            surname: row.surname,
            client_type: row.client_type_id,
            registered_on: row.registered_on,
            spend: row.spend,
        }
    }
}

/// `PostgreSQL` client repository.
pub struct PgClientRepository {
    pool: PgPool,
}

impl PgClientRepository {
    /// Create a new client repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientRepository for PgClientRepository {
    async fn find_all(&self) -> Result<Vec<Client>, RepositoryError> {
        let rows = sqlx::query_as::<_, ClientRow>(
            r"
            SELECT id, user_id, first_name, surname, client_type_id, registered_on, spend
            FROM tienda.client
            ORDER BY surname, first_name
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Client::from).collect())
    }

    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError> {
        let row = sqlx::query_as::<_, ClientRow>(
            r"
            SELECT id, user_id, first_name, surname, client_type_id, registered_on, spend
            FROM tienda.client
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Client::from))
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Client>, RepositoryError> {
        let row = sqlx::query_as::<_, ClientRow>(
            r"
            SELECT id, user_id, first_name, surname, client_type_id, registered_on, spend
            FROM tienda.client
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Client::from))
    }

    async fn save(&self, client: &Client) -> Result<Client, RepositoryError> {
        let row = sqlx::query_as::<_, ClientRow>(
            r"
            INSERT INTO tienda.client
                (id, user_id, first_name, surname, client_type_id, registered_on, spend)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                surname = EXCLUDED.surname,
                client_type_id = EXCLUDED.client_type_id,
                spend = EXCLUDED.spend
            RETURNING id, user_id, first_name, surname, client_type_id, registered_on, spend
            ",
        )
        .bind(client.id)
        .bind(client.user_id)
        .bind(&client.first_name)
        .bind(&client.surname)
        .bind(client.client_type)
        .bind(client.registered_on)
        .bind(client.spend)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "client profile"))?;

        Ok(Client::from(row))
    }
}
