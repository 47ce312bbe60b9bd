//! Bearer token extractors.
//!
//! `RequireAuth` accepts any valid token; `RequireAdmin` additionally requires
//! the `Admin` role. Both read `Authorization: Bearer <token>`.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use bookly_core::{UserId, UserRole};

use crate::error::set_sentry_user;
use crate::state::AppState;

/// Identity carried by a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub role: UserRole,
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_books(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.id)
/// }
/// ```
pub struct RequireAuth(pub AuthUser);

/// Extractor that requires a valid bearer token with the `Admin` role.
pub struct RequireAdmin(pub AuthUser);

/// Error returned when a request is not authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No `Authorization: Bearer` header.
    MissingToken,
    /// Token is malformed, forged or expired.
    InvalidToken,
    /// Token is valid but the role is insufficient.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "No token provided"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admin access required"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Pull the token out of an `Authorization` header value.
///
/// Only an absent header counts as missing; any header that is not
/// `Bearer <token>` is an invalid token.
fn bearer_token(parts: &Parts) -> Result<&str, AuthRejection> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthRejection::MissingToken)?;
    let value = header.to_str().map_err(|_| AuthRejection::InvalidToken)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthRejection::InvalidToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthRejection::InvalidToken);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthRejection::InvalidToken);
    }
    Ok(token)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims = state.tokens().verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AuthRejection::InvalidToken
        })?;

        set_sentry_user(&claims.user_id, None);

        Ok(Self(AuthUser {
            id: claims.user_id,
            role: claims.role,
        }))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;

        if !user.role.is_admin() {
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/users/me");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Ok("abc.def"));
        assert_eq!(bearer_token(&parts(Some("bearer  abc "))), Ok("abc"));
        assert_eq!(
            bearer_token(&parts(None)),
            Err(AuthRejection::MissingToken)
        );
    }

    #[test]
    fn test_unusable_header_is_invalid_token() {
        for value in ["Basic dXNlcjpwdw==", "Bearer", "Bearer ", "garbage"] {
            assert_eq!(
                bearer_token(&parts(Some(value))),
                Err(AuthRejection::InvalidToken),
                "{value}"
            );
        }
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(
            AuthRejection::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
