//! Admin and user session tokens.
//!
//! Two independent signing contexts with 24h lifetimes. Each verifier checks
//! signature, expiry and the role claim, in that order.

use chrono::{DateTime, Duration, Utc};

use super::TokenError;
use super::jwt::SigningKey;
use crate::models::claims::{ADMIN_ROLE, AdminClaims, USER_ROLE, UserClaims};
use crate::models::{Admin, User};

/// Session token lifetime for both admins and users: 24 hours.
pub const SESSION_TOKEN_EXPIRY_SECS: i64 = 24 * 60 * 60;

/// Admin session signer/verifier.
#[derive(Debug, Clone)]
pub struct AdminTokens {
    key: SigningKey,
}

impl AdminTokens {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: SigningKey::from_secret(secret),
        }
    }

    /// Issue a 24h session token for `admin`.
    pub fn issue(&self, admin: &Admin) -> Result<String, TokenError> {
        self.issue_at(admin, Utc::now())
    }

    pub(crate) fn issue_at(&self, admin: &Admin, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.key.sign(&AdminClaims {
            id: admin.id.clone(),
            email: admin.email.clone(),
            role: ADMIN_ROLE.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(SESSION_TOKEN_EXPIRY_SECS)).timestamp(),
        })
    }

    /// Verify an admin session token, returning the admin ID.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let claims: AdminClaims = self.key.verify(token)?;
        if claims.role != ADMIN_ROLE {
            return Err(TokenError::WrongRole {
                expected: ADMIN_ROLE,
            });
        }
        if claims.id.is_empty() {
            return Err(TokenError::Malformed("empty id claim".into()));
        }
        Ok(claims.id)
    }
}

/// Identity resolved from a user session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPrincipal {
    pub user_id: String,
    pub application_id: String,
}

/// User session signer/verifier.
#[derive(Debug, Clone)]
pub struct UserTokens {
    key: SigningKey,
}

impl UserTokens {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: SigningKey::from_secret(secret),
        }
    }

    /// Issue a 24h session token for `user`.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now())
    }

    pub(crate) fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.key.sign(&UserClaims {
            id: user.id.clone(),
            email: user.email.clone(),
            application_id: user.application_id.clone(),
            role: USER_ROLE.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(SESSION_TOKEN_EXPIRY_SECS)).timestamp(),
        })
    }

    /// Verify a user session token.
    pub fn verify(&self, token: &str) -> Result<UserPrincipal, TokenError> {
        let claims: UserClaims = self.key.verify(token)?;
        if claims.role != USER_ROLE {
            return Err(TokenError::WrongRole {
                expected: USER_ROLE,
            });
        }
        if claims.id.is_empty() || claims.application_id.is_empty() {
            return Err(TokenError::Malformed("empty id claim".into()));
        }
        Ok(UserPrincipal {
            user_id: claims.id,
            application_id: claims.application_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uuid::new_id;

    fn admin() -> Admin {
        let now = Utc::now();
        Admin {
            id: new_id(),
            email: "a@x.com".into(),
            first_name: "Ada".into(),
            last_name: "Admin".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: new_id(),
            email: "u@x.com".into(),
            first_name: "Una".into(),
            last_name: "User".into(),
            application_id: new_id(),
            created_at: now,
            updated_at: now,
        }
    }

    fn admin_tokens() -> AdminTokens {
        AdminTokens::new(b"admin-secret")
    }

    fn user_tokens() -> UserTokens {
        UserTokens::new(b"user-secret")
    }

    /// Flip one character inside the signature segment.
    fn tamper(token: &str) -> String {
        let sig_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.as_bytes().to_vec();
        let i = sig_start + (bytes.len() - sig_start) / 2;
        bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn admin_round_trip_yields_id() {
        let a = admin();
        let token = admin_tokens().issue(&a).unwrap();
        assert_eq!(admin_tokens().verify(&token).unwrap(), a.id);
    }

    #[test]
    fn tampered_admin_signature_is_rejected() {
        let token = admin_tokens().issue(&admin()).unwrap();
        assert_eq!(
            admin_tokens().verify(&tamper(&token)).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn expired_admin_token_is_rejected() {
        let issued = Utc::now() - Duration::hours(25);
        let token = admin_tokens().issue_at(&admin(), issued).unwrap();
        assert_eq!(admin_tokens().verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn user_round_trip_yields_principal() {
        let u = user();
        let token = user_tokens().issue(&u).unwrap();
        let principal = user_tokens().verify(&token).unwrap();
        assert_eq!(principal.user_id, u.id);
        assert_eq!(principal.application_id, u.application_id);
    }

    #[test]
    fn user_token_never_verifies_as_admin() {
        for _ in 0..8 {
            let token = user_tokens().issue(&user()).unwrap();
            assert_eq!(
                admin_tokens().verify(&token).unwrap_err(),
                TokenError::InvalidSignature
            );
        }
    }

    #[test]
    fn admin_token_never_verifies_as_user() {
        for _ in 0..8 {
            let token = admin_tokens().issue(&admin()).unwrap();
            assert_eq!(
                user_tokens().verify(&token).unwrap_err(),
                TokenError::InvalidSignature
            );
        }
    }

    #[test]
    fn wrong_role_under_admin_secret_is_rejected() {
        let now = Utc::now();
        let forged = SigningKey::from_secret(b"admin-secret")
            .sign(&AdminClaims {
                id: new_id(),
                email: "a@x.com".into(),
                role: USER_ROLE.into(),
                iat: now.timestamp(),
                exp: (now + Duration::hours(1)).timestamp(),
            })
            .unwrap();
        assert_eq!(
            admin_tokens().verify(&forged).unwrap_err(),
            TokenError::WrongRole {
                expected: ADMIN_ROLE
            }
        );
    }

    #[test]
    fn missing_claims_are_malformed() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = SigningKey::from_secret(b"user-secret")
            .sign(&serde_json::json!({ "id": new_id(), "role": "user", "exp": exp }))
            .unwrap();
        assert!(matches!(
            user_tokens().verify(&token),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn mistyped_claims_are_malformed() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = SigningKey::from_secret(b"admin-secret")
            .sign(&serde_json::json!({
                "id": 42, "email": "a@x.com", "role": "admin", "iat": 0, "exp": exp
            }))
            .unwrap();
        assert!(matches!(
            admin_tokens().verify(&token),
            Err(TokenError::Malformed(_))
        ));
    }
}
