//! Business flows behind the HTTP handlers.
//!
//! Services take the shared [`AppState`](crate::AppState) plus already
//! validated request bodies and return response bodies. Authorization
//! (which principal may touch which tenant) is decided here via the
//! ownership guard, never in handlers.

pub mod admin;
pub mod applications;
pub mod users;

use idp_core::auth::PasswordHasher;

use crate::AppState;
use crate::error::{AppError, AppResult};

/// Hash a password on the blocking pool; bcrypt would otherwise stall the
/// runtime worker for the whole cost.
pub(crate) async fn hash_password(hasher: PasswordHasher, password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| AppError::Internal(format!("password hash task: {e}")))?
        .map_err(AppError::from)
}

/// Verify a password on the blocking pool.
pub(crate) async fn verify_password(
    hasher: PasswordHasher,
    password: String,
    hash: String,
) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("password verify task: {e}")))?
        .map_err(AppError::from)
}

/// Burn one bcrypt verification against the decoy hash. Called on logins
/// for unknown emails so their latency matches a wrong password.
pub(crate) async fn verify_decoy(state: &AppState, password: String) -> AppResult<()> {
    verify_password(state.hasher, password, state.password_decoy.to_string()).await?;
    Ok(())
}

/// Emails are matched case-insensitively and without surrounding whitespace.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trim a patch field; the request validator already rejected blanks.
pub(crate) fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[tokio::test]
    async fn decoy_check_runs_bcrypt_and_succeeds() {
        let state = crate::tests::state(4);
        assert!(verify_decoy(&state, "whatever".into()).await.is_ok());
    }

    #[tokio::test]
    async fn hash_then_verify_off_runtime() {
        let hasher = PasswordHasher::new(4).unwrap();
        let hash = hash_password(hasher, "pw".into()).await.unwrap();
        assert!(verify_password(hasher, "pw".into(), hash.clone()).await.unwrap());
        assert!(!verify_password(hasher, "nope".into(), hash).await.unwrap());
    }
}
