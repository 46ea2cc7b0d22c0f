//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Registration, login for users and administrators, password recovery
//! - `client_filter` - Parameterized filtering of the administration client list
//! - `validation` - Accumulated form validation messages

pub mod auth;
pub mod client_filter;
pub mod validation;

pub use auth::{AuthError, AuthService};
pub use client_filter::{ClientFilter, FilterError, FilterForm, FilterMode, filter_clients};
pub use validation::ValidationErrors;
