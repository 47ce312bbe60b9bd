//! HTTP route handlers for the Bookly API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Banner
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Readiness (database ping)
//!
//! # Users
//! POST /api/users/register            - Create an account
//! POST /api/users/login               - Exchange credentials for a token
//! GET  /api/users/me                  - Current account (auth)
//! GET  /api/users                     - All accounts (admin)
//!
//! # Books
//! GET  /api/books/all                 - Whole catalog
//! GET  /api/books/{userId|ISBN}       - A user's collection, or one book by ISBN
//! GET  /api/books/createdBy/{userId}  - Books a user created
//! GET  /api/books/by-id/{id}          - One book by ID
//! POST /api/books/search-by-isbn      - Resolve an ISBN into a form (auth)
//! POST /api/books                     - Save a book to the caller's collection (auth)
//! ```

pub mod books;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list))
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/me", get(users::me))
}

/// Create the book routes router.
pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(books::upsert))
        .route("/all", get(books::all))
        .route("/search-by-isbn", post(books::search_by_isbn))
        .route("/createdBy/{user_id}", get(books::created_by))
        .route("/by-id/{id}", get(books::by_id))
        .route("/{key}", get(books::by_key))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/users", user_routes())
        .nest("/api/books", book_routes())
}

/// Build the complete application with its middleware stack.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors_origins);

    routes()
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Permissive CORS unless an origin list is configured.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn banner() -> &'static str {
    "📚 Bookly API is running!"
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
