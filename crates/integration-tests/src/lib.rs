//! Integration tests for the Bookly API.
//!
//! These tests talk to a running server over HTTP and are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! # Prepare the database and demo accounts
//! cargo run -p bookly-cli -- migrate
//! cargo run -p bookly-cli -- seed
//!
//! # Start the API
//! cargo run -p bookly-api
//!
//! # Run integration tests
//! cargo test -p bookly-integration-tests -- --ignored
//! ```
//!
//! Set `BOOKLY_BASE_URL` to target a server other than `http://localhost:3001`.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Password used for every account the tests register.
pub const TEST_PASSWORD: &str = "integration-pass";

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("BOOKLY_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:3001".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// HTTP client plus the server it talks to.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

/// An account registered for a single test.
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: base_url(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Register a fresh account and log it in.
    pub async fn register_user(&self) -> TestUser {
        let email = format!("integration-{}@example.com", Uuid::new_v4());

        let resp = self
            .client
            .post(self.url("/api/users/register"))
            .json(&json!({
                "email": email,
                "name": "Integration",
                "surname": "Test",
                "password": TEST_PASSWORD,
            }))
            .send()
            .await
            .expect("Failed to register user");
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = self
            .client
            .post(self.url("/api/users/login"))
            .json(&json!({ "email": email, "password": TEST_PASSWORD }))
            .send()
            .await
            .expect("Failed to log in")
            .json()
            .await
            .expect("Failed to parse login response");

        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            email,
            token: body["token"].as_str().unwrap().to_string(),
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A syntactically valid ISBN-13 that no other test run will use.
#[must_use]
pub fn unique_isbn() -> String {
    let digits = Uuid::new_v4().as_u128() % 10_000_000_000;
    format!("979{digits:010}")
}
