//! Authentication middleware: Bearer token extraction and per-domain
//! verification.
//!
//! Each token domain gets its own layer. A token signed for one domain never
//! verifies in another because every domain has its own secret.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use idp_core::auth::UserPrincipal;
use idp_core::auth::jwt::fingerprint;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// Admin resolved from an admin session token.
#[derive(Debug, Clone)]
pub struct AdminPrincipal(pub String);

/// Application resolved from an application access token.
#[derive(Debug, Clone)]
pub struct ApplicationPrincipal(pub String);

/// User resolved from a user session token.
#[derive(Debug, Clone)]
pub struct UserSession(pub UserPrincipal);

/// Pull the token out of `Authorization: Bearer <token>`. The scheme is
/// matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::Unauthorized("Invalid authorization scheme".into()));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized("Missing bearer token".into()));
    }
    Ok(token)
}

/// Requires a valid admin session token; injects [`AdminPrincipal`].
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let admin_id = state.keys.admin.verify(token).map_err(|e| {
        debug!(token = %fingerprint(token), error = %e, "admin token rejected");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    request.extensions_mut().insert(AdminPrincipal(admin_id));
    Ok(next.run(request).await)
}

/// Requires a valid application access token; injects
/// [`ApplicationPrincipal`].
pub async fn require_access_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let application_id = state
        .keys
        .application
        .verify_access_token(token)
        .map_err(|e| {
            debug!(token = %fingerprint(token), error = %e, "access token rejected");
            AppError::Unauthorized("Invalid or expired access token".into())
        })?;

    request
        .extensions_mut()
        .insert(ApplicationPrincipal(application_id));
    Ok(next.run(request).await)
}

/// Requires a valid user session token; injects [`UserSession`].
pub async fn require_user_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let principal = state.keys.user.verify(token).map_err(|e| {
        debug!(token = %fingerprint(token), error = %e, "user token rejected");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    request.extensions_mut().insert(UserSession(principal));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&headers("Bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(&headers("bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(&headers("BEARER abc")).unwrap(), "abc");
    }

    #[test]
    fn missing_or_foreign_scheme_is_rejected() {
        assert!(bearer_token(&HeaderMap::new()).is_err());
        assert!(bearer_token(&headers("Basic abc")).is_err());
        assert!(bearer_token(&headers("Bearer")).is_err());
        assert!(bearer_token(&headers("Bearer   ")).is_err());
    }
}
