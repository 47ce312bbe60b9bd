//! Core types for Bookly.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod date;
pub mod email;
pub mod id;
pub mod isbn;
pub mod role;

pub use date::{DateError, parse_published_date};
pub use email::{Email, EmailError};
pub use id::*;
pub use isbn::{Isbn, IsbnError};
pub use role::UserRole;
