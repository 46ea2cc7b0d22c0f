//! Read-only catalog repository.

use async_trait::async_trait;
use sqlx::PgPool;

use tienda_core::{BlockReasonId, ClientTypeId, RecoveryQuestionId};

use super::RepositoryError;
use crate::models::{BlockReason, ClientType, RecoveryQuestion};

/// Reads the seeded reference catalogs.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn client_types(&self) -> Result<Vec<ClientType>, RepositoryError>;

    async fn block_reasons(&self) -> Result<Vec<BlockReason>, RepositoryError>;

    async fn recovery_questions(&self) -> Result<Vec<RecoveryQuestion>, RepositoryError>;

    /// Check the backing store is reachable (readiness probe).
    async fn ping(&self) -> Result<(), RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct ClientTypeRow {
    id: ClientTypeId,
    code: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct BlockReasonRow {
    id: BlockReasonId,
    name: String,
}

#[derive(sqlx::FromRow)]
struct RecoveryQuestionRow {
    id: RecoveryQuestionId,
    question: String,
}

/// `PostgreSQL` catalog repository.
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn client_types(&self) -> Result<Vec<ClientType>, RepositoryError> {
        let rows = sqlx::query_as::<_, ClientTypeRow>(
            "SELECT id, code, name FROM tienda.client_type ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ClientType {
                id: r.id,
                code: r.code,
                name: r.name,
            })
            .collect())
    }

    async fn block_reasons(&self) -> Result<Vec<BlockReason>, RepositoryError> {
        let rows =
            sqlx::query_as::<_, BlockReasonRow>("SELECT id, name FROM tienda.block_reason ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|r| BlockReason {
                id: r.id,
                name: r.name,
            })
            .collect())
    }

    async fn recovery_questions(&self) -> Result<Vec<RecoveryQuestion>, RepositoryError> {
        let rows = sqlx::query_as::<_, RecoveryQuestionRow>(
            "SELECT id, question FROM tienda.recovery_question ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| RecoveryQuestion {
                id: r.id,
                question: r.question,
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
