//! Bookly Core - Shared domain types.
//!
//! This crate provides the types shared by the Bookly components:
//! - `api` - The HTTP JSON backend consumed by the web and mobile clients
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and parsing - no I/O, no database access,
//! no HTTP clients. Database encoding is available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, ISBNs, roles and publication dates

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
