//! # idp_core
//!
//! Core identity logic: the three token domains, password hashing, the
//! tenant ownership guard and the credential store.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod store;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
