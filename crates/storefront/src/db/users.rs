//! User repository for database operations.
//!
//! Users and their recovery data. Password hashes only leave this module
//! through [`UserRepository::find_credentials`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tienda_core::{BlockReasonId, Email, RecoveryQuestionId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{NewUser, StoredRecovery, User};

/// Persistence operations on users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All users, ordered by email.
    async fn find_all(&self) -> Result<Vec<User>, RepositoryError>;

    /// A user by ID.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// A user and their password hash, by email.
    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Whether a user is registered under this email.
    async fn exists(&self, email: &Email) -> Result<bool, RepositoryError>;

    /// Create a user together with their recovery data.
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError>;

    /// Attach or clear a block reason.
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    async fn set_block_reason(
        &self,
        id: UserId,
        reason: Option<BlockReasonId>,
    ) -> Result<(), RepositoryError>;

    /// Stored recovery data for the user with this email.
    async fn find_recovery(&self, email: &Email)
    -> Result<Option<StoredRecovery>, RepositoryError>;

    /// Replace a user's password hash.
    async fn update_password(&self, id: UserId, password_hash: &str)
    -> Result<(), RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: Email,
    block_reason_id: Option<BlockReasonId>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            block_reason: row.block_reason_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[derive(sqlx::FromRow)]
struct RecoveryRow {
    user_id: UserId,
    question_id: RecoveryQuestionId,
    answer_hash: String,
}

/// `PostgreSQL` user repository.
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, block_reason_id, created_at
            FROM tienda.user_account
            ORDER BY email
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, block_reason_id, created_at
            FROM tienda.user_account
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, email, block_reason_id, created_at, password_hash
            FROM tienda.user_account
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| (User::from(r.user), r.password_hash)))
    }

    async fn exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM tienda.user_account WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO tienda.user_account (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, block_reason_id, created_at
            ",
        )
        .bind(UserId::generate())
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;

        sqlx::query(
            r"
            INSERT INTO tienda.password_recovery (user_id, question_id, answer_hash)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(row.id)
        .bind(new_user.recovery_question)
        .bind(&new_user.recovery_answer_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %row.id, "Created user");
        Ok(User::from(row))
    }

    async fn set_block_reason(
        &self,
        id: UserId,
        reason: Option<BlockReasonId>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE tienda.user_account
            SET block_reason_id = $2
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_recovery(
        &self,
        email: &Email,
    ) -> Result<Option<StoredRecovery>, RepositoryError> {
        let row = sqlx::query_as::<_, RecoveryRow>(
            r"
            SELECT r.user_id, r.question_id, r.answer_hash
            FROM tienda.password_recovery r
            JOIN tienda.user_account u ON u.id = r.user_id
            WHERE u.email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| StoredRecovery {
            user_id: r.user_id,
            question: r.question_id,
            answer_hash: r.answer_hash,
        }))
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE tienda.user_account
            SET password_hash = $2
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
