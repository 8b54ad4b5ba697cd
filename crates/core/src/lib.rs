//! Tienda Core - Shared domain types.
//!
//! This crate provides the types shared by the Tienda components:
//! - `storefront` - The web application (catalog, cart, checkout, admin panel)
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access. Database encoding lives behind the optional `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for typed IDs, prices, emails, roles and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
