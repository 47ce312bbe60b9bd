//! Integration tests for the shared catalog and personal collections.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The API running (cargo run -p bookly-api)
//!
//! Run with: cargo test -p bookly-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use bookly_integration_tests::{TestContext, TestUser, unique_isbn};
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn save_book(ctx: &TestContext, user: &TestUser, book: &Value) -> (StatusCode, Value) {
    let resp = ctx
        .client
        .post(ctx.url("/api/books"))
        .bearer_auth(&user.token)
        .json(book)
        .send()
        .await
        .expect("Failed to save book");
    let status = resp.status();
    (status, resp.json().await.expect("Failed to parse book"))
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_save_book_requires_token() {
    let ctx = TestContext::new();

    let resp = ctx
        .client
        .post(ctx.url("/api/books"))
        .json(&json!({ "title": "Anonymous" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "No token provided");
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_book_shared_between_collections() {
    let ctx = TestContext::new();
    let alice = ctx.register_user().await;
    let bob = ctx.register_user().await;
    let isbn = unique_isbn();

    let book = json!({
        "ISBN": isbn,
        "title": "Integration Testing in Practice",
        "authors": ["Ada Tester"],
        "genres": ["Software"],
        "page_count": 321,
    });

    let (status, created) = save_book(&ctx, &alice, &book).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["ISBN"], isbn.as_str());
    assert_eq!(created["created_by"]["id"], alice.id.as_str());

    // Same ISBN from a second reader joins the existing record.
    let (status, joined) = save_book(&ctx, &bob, &book).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["id"], created["id"]);
    assert_eq!(joined["addedByUsers"].as_array().unwrap().len(), 2);

    let collection: Vec<Value> = ctx
        .client
        .get(ctx.url(&format!("/api/books/{}", bob.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(collection.iter().any(|b| b["id"] == created["id"]));

    let by_isbn: Value = ctx
        .client
        .get(ctx.url(&format!("/api/books/{isbn}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_isbn["id"], created["id"]);

    let created_by: Vec<Value> = ctx
        .client
        .get(ctx.url(&format!("/api/books/createdBy/{}", alice.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created_by.len(), 1);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_search_existing_book_locks_fields() {
    let ctx = TestContext::new();
    let alice = ctx.register_user().await;
    let bob = ctx.register_user().await;
    let isbn = unique_isbn();

    let (status, _) = save_book(
        &ctx,
        &alice,
        &json!({ "ISBN": isbn, "title": "Locked Fields", "authors": ["A. Author"] }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let resp = ctx
        .client
        .post(ctx.url("/api/books/search-by-isbn"))
        .bearer_auth(&bob.token)
        .json(&json!({ "ISBN": isbn }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let result: Value = resp.json().await.unwrap();
    assert_eq!(result["source"], "database");
    assert_eq!(result["book"]["title"], "Locked Fields");
    let disabled = result["disabledFields"].as_array().unwrap();
    assert!(disabled.iter().any(|f| f == "title"));

    // The owner gets a conflict instead of a form.
    let resp = ctx
        .client
        .post(ctx.url("/api/books/search-by-isbn"))
        .bearer_auth(&alice.token)
        .json(&json!({ "ISBN": isbn }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_author_names_shared_across_case() {
    let ctx = TestContext::new();
    let user = ctx.register_user().await;
    let author = format!("Case Author {}", unique_isbn());

    let (_, first) = save_book(
        &ctx,
        &user,
        &json!({ "ISBN": unique_isbn(), "title": "First", "authors": [author] }),
    )
    .await;
    let (_, second) = save_book(
        &ctx,
        &user,
        &json!({ "ISBN": unique_isbn(), "title": "Second", "authors": [author.to_uppercase()] }),
    )
    .await;

    assert_eq!(first["authors"][0]["id"], second["authors"][0]["id"]);
    assert_eq!(second["authors"][0]["name"], author.as_str());
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_unknown_book_not_found() {
    let ctx = TestContext::new();

    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/books/{}", unique_isbn())))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Book not found");
}
