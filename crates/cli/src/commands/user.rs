//! User account management commands.
//!
//! # Usage
//!
//! ```bash
//! bookly-cli user create -e admin@example.com -n Ada -s Lovelace -p 'long-password' -r admin
//! bookly-cli user list
//! bookly-cli user set-password -e admin@example.com -p 'new-long-password'
//! ```

use bookly_api::db::{RepositoryError, UserRepository};
use bookly_api::models::NewUser;
use bookly_api::services::auth::{hash_password, validate_password};
use bookly_core::{Email, UserId, UserRole};

use super::{CommandError, connect};

/// Create a new user.
///
/// # Errors
///
/// Returns an error if the input is invalid, the email is taken, or the
/// database operation fails.
pub async fn create(
    email: &str,
    name: &str,
    surname: &str,
    password: &str,
    role: &str,
) -> Result<UserId, CommandError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| CommandError::InvalidRole(role.to_owned()))?;
    let parsed = Email::parse(email).map_err(|_| CommandError::InvalidEmail(email.to_owned()))?;
    validate_password(password)?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    tracing::info!("Creating user: {} ({})", parsed, role);

    let password_hash = hash_password(password)?;
    let user = users
        .create(
            &NewUser {
                email: parsed,
                name: name.trim().to_owned(),
                surname: surname.trim().to_owned(),
                role,
            },
            &password_hash,
        )
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CommandError::UserExists(email.to_owned()),
            other => CommandError::Repository(other),
        })?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user.id)
}

/// Log every account, newest first.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn list() -> Result<(), CommandError> {
    let pool = connect().await?;
    let users = UserRepository::new(&pool).list_all().await?;

    tracing::info!("{} user(s)", users.len());
    for user in &users {
        tracing::info!(
            "  {}  {} {} {} <{}>",
            user.id,
            user.role,
            user.name,
            user.surname,
            user.email
        );
    }
    Ok(())
}

/// Replace the password of the user with this email.
///
/// # Errors
///
/// Returns an error if the password is too short, no user has the email,
/// or the database operation fails.
pub async fn set_password(email: &str, password: &str) -> Result<(), CommandError> {
    let parsed = Email::parse(email).map_err(|_| CommandError::InvalidEmail(email.to_owned()))?;
    validate_password(password)?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    let user = users
        .get_by_email(&parsed)
        .await?
        .ok_or_else(|| CommandError::UserNotFound(email.to_owned()))?;

    let password_hash = hash_password(password)?;
    users.set_password_hash(user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Password updated");
    Ok(())
}
