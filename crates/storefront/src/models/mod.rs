//! Domain models for storefront.
//!
//! These are validated domain types, separate from the database row types in
//! [`crate::db`].

pub mod administrator;
pub mod catalog;
pub mod client;
pub mod session;
pub mod user;

pub use administrator::Administrator;
pub use catalog::{BlockReason, ClientType, RecoveryQuestion};
pub use client::Client;
pub use session::{CurrentAdministrator, CurrentUser, Flash, keys as session_keys};
pub use user::{NewUser, StoredRecovery, User};
