//! Account route handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use bookly_core::UserRole;

use crate::db::UserRepository;
use crate::error::{Result, set_sentry_user};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::PublicUser;
use crate::services::AuthService;
use crate::services::auth::Registration;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Registration body. Missing fields are treated as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub surname: String,
    pub password: String,
}

/// Login body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub user: PublicUser,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/users/register`
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let Json(body) = payload?;
    let auth = AuthService::new(UserRepository::new(state.pool()), state.tokens());

    let user = auth
        .register(Registration {
            email: &body.email,
            name: &body.name,
            surname: &body.surname,
            password: &body.password,
            role: UserRole::User,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created",
            user: user.into(),
        }),
    ))
}

/// `POST /api/users/login`
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(body) = payload?;
    let auth = AuthService::new(UserRepository::new(state.pool()), state.tokens());

    let (user, token) = auth.login(&body.email, &body.password).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
        user: user.into(),
    }))
}

/// `GET /api/users/me`
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<PublicUser>> {
    let auth = AuthService::new(UserRepository::new(state.pool()), state.tokens());
    let user = auth.current_user(current.id).await?;
    Ok(Json(user.into()))
}

/// `GET /api/users` (admins only)
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<PublicUser>>> {
    let auth = AuthService::new(UserRepository::new(state.pool()), state.tokens());
    let users = auth.list_users().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}
