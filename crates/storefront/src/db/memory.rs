//! In-memory implementation of every repository.
//!
//! Used by the unit and integration test suites.
//! One [`InMemoryStore`] backs all four repository traits so that, like the
//! `PostgreSQL` schema, users, recovery data and clients share one state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use tienda_core::{
    AdministratorId, BlockReasonId, ClientId, ClientTypeId, Email, RecoveryQuestionId, UserId,
};

use super::{
    AdministratorRepository, CatalogRepository, ClientRepository, RepositoryError, UserRepository,
};
use crate::models::{
    Administrator, BlockReason, Client, ClientType, NewUser, RecoveryQuestion, StoredRecovery,
    User,
};

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, (User, String)>,
    recovery: HashMap<UserId, StoredRecovery>,
    administrators: HashMap<AdministratorId, (Administrator, String)>,
    clients: HashMap<ClientId, Client>,
    client_types: Vec<ClientType>,
    block_reasons: Vec<BlockReason>,
    recovery_questions: Vec<RecoveryQuestion>,
}

/// Shared in-memory store; clones see the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    /// Empty store with no catalog rows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the same catalog rows the migration seeds.
    #[must_use]
    pub fn seeded() -> Self {
        let inner = Inner {
            client_types: vec![
                client_type(1, "standard", "Standard"),
                client_type(2, "premium", "Premium"),
                client_type(3, "wholesale", "Wholesale"),
            ],
            block_reasons: vec![
                block_reason(1, "Unpaid orders"),
                block_reason(2, "Fraudulent activity"),
                block_reason(3, "Closed at the holder's request"),
            ],
            recovery_questions: vec![
                recovery_question(1, "What was the name of your first pet?"),
                recovery_question(2, "In which city were you born?"),
                recovery_question(3, "What is your mother's maiden name?"),
            ],
            ..Inner::default()
        };

        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }
}

fn client_type(id: i32, code: &str, name: &str) -> ClientType {
    ClientType {
        id: ClientTypeId::new(id),
        code: code.to_owned(),
        name: name.to_owned(),
    }
}

fn block_reason(id: i32, name: &str) -> BlockReason {
    BlockReason {
        id: BlockReasonId::new(id),
        name: name.to_owned(),
    }
}

fn recovery_question(id: i32, question: &str) -> RecoveryQuestion {
    RecoveryQuestion {
        id: RecoveryQuestionId::new(id),
        question: question.to_owned(),
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_all(&self) -> Result<Vec<User>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().map(|(u, _)| u.clone()).collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|(u, _)| &u.email == email)
            .cloned())
    }

    async fn exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().any(|(u, _)| &u.email == email))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|(u, _)| u.email == new_user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let user = User {
            id: UserId::generate(),
            email: new_user.email,
            block_reason: None,
            created_at: Utc::now(),
        };
        inner.recovery.insert(
            user.id,
            StoredRecovery {
                user_id: user.id,
                question: new_user.recovery_question,
                answer_hash: new_user.recovery_answer_hash,
            },
        );
        inner
            .users
            .insert(user.id, (user.clone(), new_user.password_hash));

        tracing::info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    async fn set_block_reason(
        &self,
        id: UserId,
        reason: Option<BlockReasonId>,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let (user, _) = inner.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.block_reason = reason;
        Ok(())
    }

    async fn find_recovery(
        &self,
        email: &Email,
    ) -> Result<Option<StoredRecovery>, RepositoryError> {
        let inner = self.inner.read().await;
        let Some((user, _)) = inner.users.values().find(|(u, _)| &u.email == email) else {
            return Ok(None);
        };
        Ok(inner.recovery.get(&user.id).cloned())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let (_, hash) = inner.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(hash);
        Ok(())
    }
}

#[async_trait]
impl AdministratorRepository for InMemoryStore {
    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(Administrator, String)>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .administrators
            .values()
            .find(|(a, _)| &a.email == email)
            .cloned())
    }

    async fn create(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<Administrator, RepositoryError> {
        let mut inner = self.inner.write().await;

        if inner.administrators.values().any(|(a, _)| &a.email == email) {
            return Err(RepositoryError::Conflict(
                "administrator already exists".to_owned(),
            ));
        }

        let admin = Administrator {
            id: AdministratorId::generate(),
            email: email.clone(),
            created_at: Utc::now(),
        };
        inner
            .administrators
            .insert(admin.id, (admin.clone(), password_hash.to_owned()));
        Ok(admin)
    }
}

#[async_trait]
impl ClientRepository for InMemoryStore {
    async fn find_all(&self) -> Result<Vec<Client>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut clients: Vec<Client> = inner.clients.values().cloned().collect();
        clients.sort_by(|a, b| {
            a.surname
                .cmp(&b.surname)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(clients)
    }

    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.clients.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Client>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .clients
            .values()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn save(&self, client: &Client) -> Result<Client, RepositoryError> {
        let mut inner = self.inner.write().await;

        if inner
            .clients
            .values()
            .any(|c| c.user_id == client.user_id && c.id != client.id)
        {
            return Err(RepositoryError::Conflict(
                "client profile already exists".to_owned(),
            ));
        }

        let stored = match inner.clients.get(&client.id) {
            // user link and registration date are fixed at creation
            Some(existing) => Client {
                user_id: existing.user_id,
                registered_on: existing.registered_on,
                ..client.clone()
            },
            None => client.clone(),
        };
        inner.clients.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn client_types(&self) -> Result<Vec<ClientType>, RepositoryError> {
        Ok(self.inner.read().await.client_types.clone())
    }

    async fn block_reasons(&self) -> Result<Vec<BlockReason>, RepositoryError> {
        Ok(self.inner.read().await.block_reasons.clone())
    }

    async fn recovery_questions(&self) -> Result<Vec<RecoveryQuestion>, RepositoryError> {
        Ok(self.inner.read().await.recovery_questions.clone())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
