//! Admins, applications and users.
//!
//! These are internal domain records. Password hashes only ever travel inside
//! the `*WithPassword` wrappers, which are deliberately not serializable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform administrator. Owns zero or more applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin with password hash (for login flows).
#[derive(Debug, Clone)]
pub struct AdminWithPassword {
    pub admin: Admin,
    pub password_hash: String,
}

/// A tenant. Owned by exactly one admin for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,
    pub description: String,
    pub admin_id: String,
    /// The single live refresh token, if one has been issued.
    #[serde(skip_serializing, default)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Whether a non-empty refresh token is currently persisted.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// End user inside one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub application_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User with password hash (for login flows).
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub name: String,
    pub description: String,
    pub admin_id: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub application_id: String,
}

/// Partial admin update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct AdminPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
}

/// Partial application update. Ownership is not patchable.
#[derive(Debug, Clone, Default)]
pub struct ApplicationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Partial user update. Email and application are not patchable.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
}
