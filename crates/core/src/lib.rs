//! Tienda Core - Shared types library.
//!
//! This crate provides common types used across all Tienda components:
//! - `storefront` - Customer registration, personal area and administration
//! - `cli` - Command-line tools for migrations and administrator management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, amounts, emails and principal kinds

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
