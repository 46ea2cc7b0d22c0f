//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::{
    AdministratorRepository, CatalogRepository, ClientRepository, Repositories, UserRepository,
};
use crate::services::AuthService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// configuration and the repositories.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    repositories: Repositories,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `repositories` - `PostgreSQL` or in-memory repositories
    #[must_use]
    pub fn new(config: StorefrontConfig, repositories: Repositories) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                repositories,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserRepository {
        self.inner.repositories.users.as_ref()
    }

    #[must_use]
    pub fn administrators(&self) -> &dyn AdministratorRepository {
        self.inner.repositories.administrators.as_ref()
    }

    #[must_use]
    pub fn clients(&self) -> &dyn ClientRepository {
        self.inner.repositories.clients.as_ref()
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogRepository {
        self.inner.repositories.catalog.as_ref()
    }

    /// Authentication service over this state's repositories.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.users(), self.administrators())
    }
}
