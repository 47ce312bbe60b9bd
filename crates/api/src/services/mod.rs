//! Business logic services.
//!
//! Services sit between route handlers and repositories. They depend on the
//! store traits rather than concrete repositories so the rules can be tested
//! without a database.

pub mod auth;
pub mod catalog;

pub use auth::{AuthError, AuthService, Claims, TokenError, TokenService, UserStore};
pub use catalog::{CatalogError, CatalogService, CatalogStore, MetadataProvider, Upserted};
