//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use idp_core::auth::{AuthError, TokenError};
use idp_core::store::StoreError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Internal(detail) => {
                error!(%detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::DbError(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(msg) => AppError::Internal(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::CredentialError => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::Token(e) => AppError::from(e),
            AuthError::Forbidden(msg) => AppError::Forbidden(msg),
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::Store(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(e: AppError) -> StatusCode {
        e.into_response().status()
    }

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(status(AppError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(AppError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AppError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status(AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(AppError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status(AppError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn token_errors_are_unauthorized() {
        for e in [
            TokenError::InvalidSignature,
            TokenError::Expired,
            TokenError::WrongRole { expected: "admin" },
            TokenError::Malformed("x".into()),
            TokenError::InvalidRefreshToken,
            TokenError::InvalidAccessToken,
        ] {
            assert!(matches!(AppError::from(e), AppError::Unauthorized(_)));
        }
    }

    #[test]
    fn store_conflict_is_conflict() {
        let e = AppError::from(AuthError::Store(StoreError::Conflict("dup".into())));
        assert!(matches!(e, AppError::Conflict(_)));
    }
}
