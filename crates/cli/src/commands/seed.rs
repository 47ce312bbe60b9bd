//! Seed the database with demo accounts.
//!
//! Creates one admin and one reader, both with the password `Test1234.`.
//! Accounts that already exist are left untouched, so the command can be
//! re-run safely.

use bookly_api::db::UserRepository;
use bookly_api::models::NewUser;
use bookly_api::services::auth::hash_password;
use bookly_core::{Email, UserRole};

use super::{CommandError, connect};

const DEMO_PASSWORD: &str = "Test1234.";

struct DemoUser {
    email: &'static str,
    name: &'static str,
    surname: &'static str,
    role: UserRole,
}

const DEMO_USERS: &[DemoUser] = &[
    DemoUser {
        email: "admin@bookly.com",
        name: "Admin",
        surname: "User",
        role: UserRole::Admin,
    },
    DemoUser {
        email: "user@bookly.com",
        name: "John",
        surname: "Reader",
        role: UserRole::User,
    },
];

/// Create the demo accounts that don't exist yet.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    let password_hash = hash_password(DEMO_PASSWORD)?;
    let mut created = 0_usize;

    for demo in DEMO_USERS {
        let email = Email::parse(demo.email)
            .map_err(|_| CommandError::InvalidEmail(demo.email.to_owned()))?;

        if users.get_by_email(&email).await?.is_some() {
            tracing::info!(email = demo.email, "Already seeded, skipping");
            continue;
        }

        let user = users
            .create(
                &NewUser {
                    email,
                    name: demo.name.to_owned(),
                    surname: demo.surname.to_owned(),
                    role: demo.role,
                },
                &password_hash,
            )
            .await?;
        tracing::info!(user_id = %user.id, email = demo.email, role = %demo.role, "Seeded user");
        created += 1;
    }

    tracing::info!(created, "Seeding complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_users_are_valid() {
        for demo in DEMO_USERS {
            assert!(Email::parse(demo.email).is_ok(), "{}", demo.email);
        }
        assert_eq!(
            DEMO_USERS.iter().filter(|u| u.role.is_admin()).count(),
            1
        );
    }
}
