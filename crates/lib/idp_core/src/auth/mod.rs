//! Authentication and authorization logic.
//!
//! Three independent token domains (admin sessions, user sessions and
//! application refresh/access pairs), bcrypt password hashing and the tenant
//! ownership guard. Nothing here touches HTTP.

pub mod application;
pub mod guard;
pub mod jwt;
pub mod keys;
pub mod password;
pub mod session;

use thiserror::Error;

use crate::store::StoreError;

pub use application::ApplicationTokens;
pub use keys::{TokenKeys, TokenSecrets};
pub use password::PasswordHasher;
pub use session::{AdminTokens, UserPrincipal, UserTokens};

/// Token verification and signing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Signature, secret or algorithm header does not match the domain.
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("token is not for role '{expected}'")]
    WrongRole { expected: &'static str },

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("invalid access token")]
    InvalidAccessToken,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
