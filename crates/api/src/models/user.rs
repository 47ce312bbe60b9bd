//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bookly_core::{Email, UserId, UserRole};

/// A Bookly account (domain type).
///
/// The password hash is never part of this type; it is only loaded by the
/// repository for login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email, stored lower-cased.
    pub email: Email,
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
    /// Access role.
    pub role: UserRole,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub name: String,
    pub surname: String,
    pub role: UserRole,
}

/// User as exposed over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.as_str().to_owned(),
            name: user.name.clone(),
            surname: user.surname.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email.into_inner(),
            name: user.name,
            surname: user.surname,
            role: user.role,
            created_at: user.created_at,
        }
    }
}
