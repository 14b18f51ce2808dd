//! API server configuration.

use std::time::Duration;

use idp_core::auth::TokenSecrets;
use idp_core::auth::password::DEFAULT_BCRYPT_COST;
use tracing::warn;

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3200").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// One secret per signing context; must be pairwise distinct.
    pub token_secrets: TokenSecrets,
    /// bcrypt cost factor for admin and user passwords.
    pub bcrypt_cost: u32,
    /// Requests running longer than this are aborted, including any
    /// in-flight store call.
    pub request_timeout: Duration,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                  | Default                            |
    /// |---------------------------|------------------------------------|
    /// | `BIND_ADDR`               | `127.0.0.1:3200`                   |
    /// | `DATABASE_URL`            | `postgres://localhost:5432/idp`    |
    /// | `IDP_*_TOKEN_SECRET`      | generated & persisted to file      |
    /// | `BCRYPT_COST`             | `12`                               |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                               |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3200".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/idp".into()),
            token_secrets: TokenSecrets::resolve(),
            bcrypt_cost: env_parse("BCRYPT_COST").unwrap_or(DEFAULT_BCRYPT_COST),
            request_timeout: Duration::from_secs(
                env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    parse_setting(var, std::env::var(var).ok())
}

/// Parse a raw setting; an unparsable value is logged and ignored so the
/// caller falls back to its default.
fn parse_setting<T: std::str::FromStr>(var: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var, value = %raw, "ignoring unparsable setting, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_parse_trimmed_values() {
        assert_eq!(parse_setting::<u32>("BCRYPT_COST", Some(" 10 ".into())), Some(10));
        assert_eq!(parse_setting::<u32>("BCRYPT_COST", None), None);
    }

    #[test]
    fn unparsable_settings_fall_back() {
        assert_eq!(parse_setting::<u32>("BCRYPT_COST", Some("twelve".into())), None);
        assert_eq!(parse_setting::<u64>("REQUEST_TIMEOUT_SECS", Some("-3".into())), None);
    }
}
