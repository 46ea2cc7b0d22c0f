//! Per-browser session state.
//!
//! [`SessionState`] is the single value kept in the tower-sessions record. It
//! tracks who is logged in (a user and an administrator independently), a
//! one-shot flash message, and the reference lists each session memoises so a
//! page refresh does not hit the database again.
//!
//! The value is loaded and saved per request by
//! [`SessionContext`](crate::middleware::SessionContext).

use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};

use tienda_core::{Email, RecoveryQuestionId};

use crate::db::{CatalogRepository, ClientRepository, RepositoryError, UserRepository};
use crate::models::{
    BlockReason, Client, ClientType, CurrentAdministrator, CurrentUser, Flash, RecoveryQuestion,
    User,
};

/// Where a user is in the two-step email/password login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum UserLogin {
    /// Nothing entered yet.
    #[default]
    Anonymous,
    /// Email entered; waiting for the password.
    EmailCaptured { email: Email },
    /// Password verified.
    Authenticated { user: CurrentUser },
}

/// Everything a session remembers between requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    user: UserLogin,
    administrator: Option<CurrentAdministrator>,
    flash: Option<Flash>,
    users: Option<Vec<User>>,
    clients: Option<Vec<Client>>,
    client_types: Option<Vec<ClientType>>,
    block_reasons: Option<Vec<BlockReason>>,
    recovery_questions: Option<Vec<RecoveryQuestion>>,
}

impl SessionState {
    // =========================================================================
    // User principal
    // =========================================================================

    #[must_use]
    pub const fn user_login(&self) -> &UserLogin {
        &self.user
    }

    /// The authenticated user, if any.
    #[must_use]
    pub const fn current_user(&self) -> Option<&CurrentUser> {
        match &self.user {
            UserLogin::Authenticated { user } => Some(user),
            _ => None,
        }
    }

    /// The email the password page is asking about.
    #[must_use]
    pub const fn captured_email(&self) -> Option<&Email> {
        match &self.user {
            UserLogin::Anonymous => None,
            UserLogin::EmailCaptured { email } => Some(email),
            UserLogin::Authenticated { user } => Some(&user.email),
        }
    }

    /// Record the email entered on the email page.
    ///
    /// Returns `false` and leaves the state untouched when a user is already
    /// authenticated.
    #[must_use]
    pub fn capture_email(&mut self, email: Email) -> bool {
        if matches!(self.user, UserLogin::Authenticated { .. }) {
            return false;
        }
        self.user = UserLogin::EmailCaptured { email };
        true
    }

    /// Mark a user as authenticated.
    pub fn set_current_user(&mut self, user: CurrentUser) {
        self.user = UserLogin::Authenticated { user };
    }

    /// Log the user out, keeping their email so the next login only needs the
    /// password.
    pub fn clear_current_user(&mut self) {
        if let UserLogin::Authenticated { user } = &self.user {
            self.user = UserLogin::EmailCaptured {
                email: user.email.clone(),
            };
        }
    }

    // =========================================================================
    // Administrator principal
    // =========================================================================

    #[must_use]
    pub const fn current_administrator(&self) -> Option<&CurrentAdministrator> {
        self.administrator.as_ref()
    }

    pub fn set_current_administrator(&mut self, admin: CurrentAdministrator) {
        self.administrator = Some(admin);
    }

    pub fn clear_current_administrator(&mut self) {
        self.administrator = None;
    }

    // =========================================================================
    // Flash
    // =========================================================================

    pub fn set_flash(&mut self, flash: Flash) {
        self.flash = Some(flash);
    }

    /// Remove and return the pending flash message.
    pub fn take_flash(&mut self) -> Option<Flash> {
        self.flash.take()
    }

    // =========================================================================
    // Memoised lists
    // =========================================================================

    /// All users, loaded once per session until invalidated.
    ///
    /// # Errors
    ///
    /// Returns the repository error; the slot stays empty.
    pub async fn users(&mut self, repo: &dyn UserRepository) -> Result<&[User], RepositoryError> {
        memoised(&mut self.users, || repo.find_all()).await
    }

    /// The current client list: the full list on first read, or the last
    /// filtered result stored with [`Self::set_clients`].
    ///
    /// # Errors
    ///
    /// Returns the repository error; the slot stays empty.
    pub async fn clients(
        &mut self,
        repo: &dyn ClientRepository,
    ) -> Result<&[Client], RepositoryError> {
        memoised(&mut self.clients, || repo.find_all()).await
    }

    /// # Errors
    ///
    /// Returns the repository error; the slot stays empty.
    pub async fn client_types(
        &mut self,
        repo: &dyn CatalogRepository,
    ) -> Result<&[ClientType], RepositoryError> {
        memoised(&mut self.client_types, || repo.client_types()).await
    }

    /// # Errors
    ///
    /// Returns the repository error; the slot stays empty.
    pub async fn block_reasons(
        &mut self,
        repo: &dyn CatalogRepository,
    ) -> Result<&[BlockReason], RepositoryError> {
        memoised(&mut self.block_reasons, || repo.block_reasons()).await
    }

    /// # Errors
    ///
    /// Returns the repository error; the slot stays empty.
    pub async fn recovery_questions(
        &mut self,
        repo: &dyn CatalogRepository,
    ) -> Result<&[RecoveryQuestion], RepositoryError> {
        memoised(&mut self.recovery_questions, || repo.recovery_questions()).await
    }

    /// Recovery question text keyed by ID, built from the memoised list.
    ///
    /// # Errors
    ///
    /// Returns the repository error if the list has to be loaded and fails.
    pub async fn recovery_question_map(
        &mut self,
        repo: &dyn CatalogRepository,
    ) -> Result<HashMap<RecoveryQuestionId, String>, RepositoryError> {
        Ok(self
            .recovery_questions(repo)
            .await?
            .iter()
            .map(|q| (q.id, q.question.clone()))
            .collect())
    }

    /// Overwrite the client list, e.g. with a filtered result.
    pub fn set_clients(&mut self, clients: Vec<Client>) {
        self.clients = Some(clients);
    }

    pub fn invalidate_users(&mut self) {
        self.users = None;
    }

    pub fn invalidate_clients(&mut self) {
        self.clients = None;
    }
}

/// Return the cached list in `slot`, fetching it first if the slot is empty.
async fn memoised<T, F, Fut>(
    slot: &mut Option<Vec<T>>,
    fetch: F,
) -> Result<&[T], RepositoryError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>, RepositoryError>>,
{
    let list = match slot.take() {
        Some(list) => list,
        None => fetch().await?,
    };
    Ok(slot.insert(list).as_slice())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use tienda_core::{AdministratorId, ClientTypeId, UserId};

    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn current_user(s: &str) -> CurrentUser {
        CurrentUser {
            id: UserId::generate(),
            email: email(s),
        }
    }

    fn current_admin() -> CurrentAdministrator {
        CurrentAdministrator {
            id: AdministratorId::generate(),
            email: email("admin@tienda.dev"),
        }
    }

    /// Catalog that counts calls and can be told to fail.
    #[derive(Default)]
    struct CountingCatalog {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl CatalogRepository for CountingCatalog {
        async fn client_types(&self) -> Result<Vec<ClientType>, RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(vec![ClientType {
                id: ClientTypeId::new(1),
                code: "standard".to_owned(),
                name: "Standard".to_owned(),
            }])
        }

        async fn block_reasons(&self) -> Result<Vec<BlockReason>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn recovery_questions(&self) -> Result<Vec<RecoveryQuestion>, RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![RecoveryQuestion {
                id: RecoveryQuestionId::new(7),
                question: "First pet?".to_owned(),
            }])
        }

        async fn ping(&self) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    #[test]
    fn test_two_step_login() {
        let mut state = SessionState::default();
        assert_eq!(state.user_login(), &UserLogin::Anonymous);

        assert!(state.capture_email(email("ana@example.com")));
        assert_eq!(
            state.captured_email().map(Email::as_str),
            Some("ana@example.com")
        );
        assert!(state.current_user().is_none());

        let user = current_user("ana@example.com");
        state.set_current_user(user.clone());
        assert_eq!(state.current_user(), Some(&user));
    }

    #[test]
    fn test_capture_email_refused_while_authenticated() {
        let mut state = SessionState::default();
        let user = current_user("ana@example.com");
        state.set_current_user(user.clone());

        assert!(!state.capture_email(email("eve@example.com")));
        assert_eq!(state.current_user(), Some(&user));
    }

    #[test]
    fn test_logout_keeps_email_for_next_login() {
        let mut state = SessionState::default();
        state.set_current_user(current_user("ana@example.com"));

        state.clear_current_user();

        assert!(state.current_user().is_none());
        assert_eq!(
            state.user_login(),
            &UserLogin::EmailCaptured {
                email: email("ana@example.com")
            }
        );
    }

    #[test]
    fn test_principals_are_independent() {
        let mut state = SessionState::default();
        let user = current_user("ana@example.com");
        let admin = current_admin();
        state.set_current_user(user.clone());
        state.set_current_administrator(admin.clone());

        state.clear_current_administrator();
        assert_eq!(state.current_user(), Some(&user));
        assert!(state.current_administrator().is_none());

        state.set_current_administrator(admin.clone());
        state.clear_current_user();
        assert_eq!(state.current_administrator(), Some(&admin));
    }

    #[test]
    fn test_flash_is_taken_once() {
        let mut state = SessionState::default();
        state.set_flash(Flash::Error("nope".to_owned()));

        assert_eq!(state.take_flash(), Some(Flash::Error("nope".to_owned())));
        assert_eq!(state.take_flash(), None);
    }

    #[tokio::test]
    async fn test_memoised_list_fetches_once() {
        let catalog = CountingCatalog::default();
        let mut state = SessionState::default();

        assert_eq!(state.client_types(&catalog).await.unwrap().len(), 1);
        assert_eq!(state.client_types(&catalog).await.unwrap().len(), 1);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_population_leaves_slot_empty() {
        let catalog = CountingCatalog {
            fail: true,
            ..CountingCatalog::default()
        };
        let mut state = SessionState::default();

        assert!(state.client_types(&catalog).await.is_err());
        assert!(state.client_types(&catalog).await.is_err());
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_recovery_question_map_uses_cached_list() {
        let catalog = CountingCatalog::default();
        let mut state = SessionState::default();

        state.recovery_questions(&catalog).await.unwrap();
        let map = state.recovery_question_map(&catalog).await.unwrap();

        assert_eq!(
            map.get(&RecoveryQuestionId::new(7)).map(String::as_str),
            Some("First pet?")
        );
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_state_survives_serialization() {
        let mut state = SessionState::default();
        assert!(state.capture_email(email("ana@example.com")));
        state.set_current_administrator(current_admin());
        state.set_flash(Flash::Success("saved".to_owned()));

        let json = serde_json::to_value(&state).unwrap();
        let mut restored: SessionState = serde_json::from_value(json).unwrap();

        assert_eq!(restored.user_login(), state.user_login());
        assert_eq!(
            restored.current_administrator(),
            state.current_administrator()
        );
        assert_eq!(restored.take_flash(), Some(Flash::Success("saved".to_owned())));
    }
}
