//! JWT claim schemas, one per token domain.

use serde::{Deserialize, Serialize};

/// Role claim carried by admin session tokens.
pub const ADMIN_ROLE: &str = "admin";

/// Role claim carried by user session tokens.
pub const USER_ROLE: &str = "user";

/// Admin session token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Admin ID.
    pub id: String,
    pub email: String,
    /// Always `"admin"` for tokens this service issues.
    pub role: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// User session token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    /// User ID.
    pub id: String,
    pub email: String,
    pub application_id: String,
    /// Always `"user"` for tokens this service issues.
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims shared by application refresh and access tokens. The two kinds are
/// told apart by the key that signed them, never by their payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationClaims {
    #[serde(rename = "app_id")]
    pub application_id: String,
    /// Unique token id; two tokens issued in the same second still differ.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}
