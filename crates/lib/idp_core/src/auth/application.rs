//! Application refresh/access token pairs.
//!
//! Refresh tokens (7 days) are signed under one secret and persisted on the
//! application row; access tokens (15 minutes) are derived from a valid
//! refresh token and signed under a second, unrelated secret. Issuance here is
//! pure: whether an application may receive a new refresh token is decided by
//! the store, inside the transaction that persists it.

use chrono::{DateTime, Duration, Utc};

use super::TokenError;
use super::jwt::SigningKey;
use crate::models::ApplicationClaims;

/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_EXPIRY_SECS: i64 = 7 * 24 * 60 * 60;

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 15 * 60;

/// Signer/verifier pair for the application domain.
#[derive(Debug, Clone)]
pub struct ApplicationTokens {
    refresh: SigningKey,
    access: SigningKey,
}

impl ApplicationTokens {
    pub fn new(refresh_secret: &[u8], access_secret: &[u8]) -> Self {
        Self {
            refresh: SigningKey::from_secret(refresh_secret),
            access: SigningKey::from_secret(access_secret),
        }
    }

    /// Issue a refresh token for `application_id`.
    pub fn issue_refresh_token(&self, application_id: &str) -> Result<String, TokenError> {
        self.issue_refresh_token_at(application_id, Utc::now())
    }

    pub(crate) fn issue_refresh_token_at(
        &self,
        application_id: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.refresh
            .sign(&claims(application_id, now, REFRESH_TOKEN_EXPIRY_SECS))
    }

    /// Verify a refresh token's signature and expiry.
    pub fn verify_refresh_token(&self, token: &str) -> Result<ApplicationClaims, TokenError> {
        let claims: ApplicationClaims = self
            .refresh
            .verify(token)
            .map_err(|_| TokenError::InvalidRefreshToken)?;
        if claims.application_id.is_empty() {
            return Err(TokenError::InvalidRefreshToken);
        }
        Ok(claims)
    }

    /// Exchange a valid refresh token for a fresh access token.
    pub fn derive_access_token(&self, refresh_token: &str) -> Result<String, TokenError> {
        let refresh = self.verify_refresh_token(refresh_token)?;
        self.access.sign(&claims(
            &refresh.application_id,
            Utc::now(),
            ACCESS_TOKEN_EXPIRY_SECS,
        ))
    }

    /// Verify an access token, returning the application ID it is scoped to.
    pub fn verify_access_token(&self, token: &str) -> Result<String, TokenError> {
        let claims: ApplicationClaims = self
            .access
            .verify(token)
            .map_err(|_| TokenError::InvalidAccessToken)?;
        if claims.application_id.is_empty() {
            return Err(TokenError::InvalidAccessToken);
        }
        Ok(claims.application_id)
    }
}

fn claims(application_id: &str, now: DateTime<Utc>, ttl_secs: i64) -> ApplicationClaims {
    ApplicationClaims {
        application_id: application_id.to_string(),
        jti: uuid::Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ttl_secs)).timestamp(),
    }
}
