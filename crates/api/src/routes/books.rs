//! Catalog route handlers.
//!
//! Reads are public; search and save need a bearer token.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use bookly_core::{BookId, Isbn, UserId};

use crate::db::BookRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{BookInput, BookRecord, SearchResult};
use crate::services::CatalogService;
use crate::state::AppState;

/// ISBN search body.
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(rename = "ISBN", default)]
    pub isbn: String,
}

fn book_not_found() -> AppError {
    AppError::NotFound("Book not found".to_string())
}

/// `GET /api/books/all`
pub async fn all(State(state): State<AppState>) -> Result<Json<Vec<BookRecord>>> {
    let books = BookRepository::new(state.pool()).list_all().await?;
    Ok(Json(books))
}

/// `GET /api/books/{key}`
///
/// A UUID key names a user and lists their collection; anything else is
/// looked up as an ISBN.
pub async fn by_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let books = BookRepository::new(state.pool());

    if let Ok(user) = key.parse::<UserId>() {
        let collection = books.list_by_member(user).await?;
        return Ok(Json(collection).into_response());
    }

    let isbn = Isbn::parse(&key).map_err(|_| book_not_found())?;
    let book = books.get_by_isbn(&isbn).await?.ok_or_else(book_not_found)?;
    Ok(Json(book).into_response())
}

/// `GET /api/books/createdBy/{userId}`
pub async fn created_by(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<Vec<BookRecord>>> {
    let user: UserId = user
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid user id".to_string()))?;
    let books = BookRepository::new(state.pool()).list_by_creator(user).await?;
    Ok(Json(books))
}

/// `GET /api/books/by-id/{id}`
pub async fn by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookRecord>> {
    let id: BookId = id.parse().map_err(|_| book_not_found())?;
    let book = BookRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(book_not_found)?;
    Ok(Json(book))
}

/// `POST /api/books/search-by-isbn`
pub async fn search_by_isbn(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResult>> {
    let Json(body) = payload?;
    let catalog = CatalogService::new(BookRepository::new(state.pool()), state.google_books());

    let result = catalog.resolve_isbn(&body.isbn, user.id).await?;
    Ok(Json(result))
}

/// `POST /api/books`
pub async fn upsert(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: std::result::Result<Json<BookInput>, JsonRejection>,
) -> Result<(StatusCode, Json<BookRecord>)> {
    let Json(input) = payload?;
    let catalog = CatalogService::new(BookRepository::new(state.pool()), state.google_books());

    let upserted = catalog.upsert(input, user.id).await?;
    let status = if upserted.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(upserted.record)))
}
