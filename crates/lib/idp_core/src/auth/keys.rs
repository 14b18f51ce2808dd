//! Signing secrets for the four token contexts.
//!
//! Secrets are plain configuration: resolved once at startup and handed to
//! each signer at construction. Nothing here is global.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::info;

use super::AuthError;
use super::application::ApplicationTokens;
use super::session::{AdminTokens, UserTokens};

/// Environment variables, one per signing context.
pub const ADMIN_SECRET_ENV: &str = "IDP_ADMIN_TOKEN_SECRET";
pub const USER_SECRET_ENV: &str = "IDP_USER_TOKEN_SECRET";
pub const REFRESH_SECRET_ENV: &str = "IDP_REFRESH_TOKEN_SECRET";
pub const ACCESS_SECRET_ENV: &str = "IDP_ACCESS_TOKEN_SECRET";

const GENERATED_SECRET_LEN: usize = 64;

/// Raw secret material for every signing context.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSecrets {
    pub admin: String,
    pub user: String,
    pub refresh: String,
    pub access: String,
}

impl TokenSecrets {
    /// Resolve each secret: env var, then persisted file, then generate and
    /// persist a fresh one under the platform data directory.
    pub fn resolve() -> Self {
        Self::resolve_in(&default_secret_dir())
    }

    /// Like [`TokenSecrets::resolve`] but persisting under `dir`.
    pub fn resolve_in(dir: &Path) -> Self {
        let from_env = |var: &str| std::env::var(var).ok();
        Self {
            admin: resolve_secret(from_env(ADMIN_SECRET_ENV), &dir.join("admin-token-secret")),
            user: resolve_secret(from_env(USER_SECRET_ENV), &dir.join("user-token-secret")),
            refresh: resolve_secret(
                from_env(REFRESH_SECRET_ENV),
                &dir.join("refresh-token-secret"),
            ),
            access: resolve_secret(
                from_env(ACCESS_SECRET_ENV),
                &dir.join("access-token-secret"),
            ),
        }
    }

    /// Every secret must be non-empty and no two contexts may share one,
    /// otherwise a token from one domain would verify in another.
    pub fn validate(&self) -> Result<(), AuthError> {
        let all = [
            ("admin", &self.admin),
            ("user", &self.user),
            ("refresh", &self.refresh),
            ("access", &self.access),
        ];
        if let Some((name, _)) = all.iter().find(|(_, s)| s.is_empty()) {
            return Err(AuthError::ValidationError(format!(
                "{name} token secret is empty"
            )));
        }
        let distinct: HashSet<&str> = all.iter().map(|(_, s)| s.as_str()).collect();
        if distinct.len() != all.len() {
            return Err(AuthError::ValidationError(
                "token secrets must be distinct per domain".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for TokenSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenSecrets { .. }")
    }
}

/// Signers/verifiers for all three domains, built from validated secrets.
#[derive(Debug, Clone)]
pub struct TokenKeys {
    pub admin: AdminTokens,
    pub user: UserTokens,
    pub application: ApplicationTokens,
}

impl TokenKeys {
    pub fn new(secrets: &TokenSecrets) -> Result<Self, AuthError> {
        secrets.validate()?;
        Ok(Self {
            admin: AdminTokens::new(secrets.admin.as_bytes()),
            user: UserTokens::new(secrets.user.as_bytes()),
            application: ApplicationTokens::new(
                secrets.refresh.as_bytes(),
                secrets.access.as_bytes(),
            ),
        })
    }
}

fn resolve_secret(from_env: Option<String>, path: &Path) -> String {
    if let Some(secret) = from_env
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret = generate_secret();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(path, &secret);
    info!(path = %path.display(), "generated new token secret");
    secret
}

fn generate_secret() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LEN)
        .map(char::from)
        .collect()
}

/// Directory holding generated secrets.
fn default_secret_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("idp")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> TokenSecrets {
        TokenSecrets {
            admin: "admin-secret".into(),
            user: "user-secret".into(),
            refresh: "refresh-secret".into(),
            access: "access-secret".into(),
        }
    }

    #[test]
    fn distinct_secrets_are_accepted() {
        assert!(TokenKeys::new(&secrets()).is_ok());
    }

    #[test]
    fn shared_secret_is_rejected() {
        let mut s = secrets();
        s.access = s.refresh.clone();
        assert!(matches!(
            TokenKeys::new(&s),
            Err(AuthError::ValidationError(_))
        ));
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut s = secrets();
        s.user = String::new();
        assert!(s.validate().is_err());
    }

    #[test]
    fn debug_never_prints_secrets() {
        let rendered = format!("{:?}", secrets());
        assert!(!rendered.contains("admin-secret"));
    }

    #[test]
    fn env_value_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s");
        assert_eq!(resolve_secret(Some("from-env".into()), &path), "from-env");
        assert!(!path.exists());
    }

    #[test]
    fn generated_secret_is_persisted_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("s");
        let first = resolve_secret(None, &path);
        assert_eq!(first.len(), GENERATED_SECRET_LEN);
        assert_eq!(resolve_secret(Some(String::new()), &path), first);
    }

    #[test]
    fn resolve_in_generates_distinct_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = TokenSecrets::resolve_in(dir.path());
        // Only meaningful when the env vars are unset, which is the norm in CI.
        if std::env::var(ADMIN_SECRET_ENV).is_err() {
            assert!(resolved.validate().is_ok());
        }
    }
}
