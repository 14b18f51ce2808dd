//! API request and response bodies.
//!
//! Request bodies deserialize with missing fields defaulted, then declare
//! their required fields explicitly in [`Validate`]; that way a missing and an
//! empty field produce the same 400.

use chrono::{DateTime, Utc};
use idp_core::models::{Admin, Application, User};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Per-payload validation, run by [`crate::extract::ValidJson`].
pub trait Validate {
    fn validate(&self) -> AppResult<()>;
}

/// Fail with one 400 naming every required field that is empty.
fn require(fields: &[(&'static str, &str)]) -> AppResult<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Patch fields, when present, must not be blank.
fn non_blank(fields: &[(&'static str, Option<&str>)]) -> AppResult<()> {
    if fields.iter().all(|(_, v)| v.is_none()) {
        return Err(AppError::Validation("nothing to update".into()));
    }
    let present: Vec<(&'static str, &str)> = fields
        .iter()
        .filter_map(|(name, v)| v.map(|v| (*name, v)))
        .collect();
    require(&present)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterAdminRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl Validate for RegisterAdminRequest {
    fn validate(&self) -> AppResult<()> {
        require(&[
            ("email", self.email.as_str()),
            ("password", self.password.as_str()),
            ("first_name", self.first_name.as_str()),
            ("last_name", self.last_name.as_str()),
        ])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> AppResult<()> {
        require(&[("email", self.email.as_str()), ("password", self.password.as_str())])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateAdminRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

impl Validate for UpdateAdminRequest {
    fn validate(&self) -> AppResult<()> {
        non_blank(&[
            ("first_name", self.first_name.as_deref()),
            ("last_name", self.last_name.as_deref()),
            ("password", self.password.as_deref()),
        ])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateApplicationRequest {
    pub name: String,
    pub description: String,
}

impl Validate for CreateApplicationRequest {
    fn validate(&self) -> AppResult<()> {
        require(&[("name", self.name.as_str()), ("description", self.description.as_str())])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateApplicationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Validate for UpdateApplicationRequest {
    fn validate(&self) -> AppResult<()> {
        non_blank(&[
            ("name", self.name.as_deref()),
            ("description", self.description.as_deref()),
        ])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    /// Optional; when given it must name the access token's application.
    pub application_id: Option<String>,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> AppResult<()> {
        require(&[
            ("email", self.email.as_str()),
            ("password", self.password.as_str()),
            ("first_name", self.first_name.as_str()),
            ("last_name", self.last_name.as_str()),
        ])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserLoginRequest {
    pub application_id: String,
    pub email: String,
    pub password: String,
}

impl Validate for UserLoginRequest {
    fn validate(&self) -> AppResult<()> {
        require(&[
            ("application_id", self.application_id.as_str()),
            ("email", self.email.as_str()),
            ("password", self.password.as_str()),
        ])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> AppResult<()> {
        non_blank(&[
            ("first_name", self.first_name.as_deref()),
            ("last_name", self.last_name.as_deref()),
            ("password", self.password.as_deref()),
        ])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccessTokenRequest {
    pub refresh_token: String,
}

impl Validate for AccessTokenRequest {
    fn validate(&self) -> AppResult<()> {
        require(&[("refresh_token", self.refresh_token.as_str())])
    }
}

/// `?offset=&limit=` query string. Absent or empty values count as 0.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct PaginationQuery {
    #[serde(deserialize_with = "empty_as_zero")]
    pub offset: u32,
    #[serde(deserialize_with = "empty_as_zero")]
    pub limit: u32,
}

fn empty_as_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse()
        .map_err(|_| serde::de::Error::custom(format!("expected a non-negative integer, got '{raw}'")))
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Admin plus a fresh admin session token.
#[derive(Debug, Clone, Serialize)]
pub struct AdminSessionResponse {
    pub admin: Admin,
    pub token: String,
}

/// User plus a fresh user session token.
#[derive(Debug, Clone, Serialize)]
pub struct UserSessionResponse {
    pub user: User,
    pub token: String,
}

/// Application as exposed over HTTP. The persisted refresh token itself is
/// never echoed back; only whether one is live.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub admin_id: String,
    pub has_refresh_token: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Application> for ApplicationResponse {
    fn from(app: Application) -> Self {
        let has_refresh_token = app.has_refresh_token();
        Self {
            id: app.id,
            name: app.name,
            description: app.description,
            admin_id: app.admin_id,
            has_refresh_token,
            created_at: app.created_at,
            updated_at: app.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationListResponse {
    pub applications: Vec<ApplicationResponse>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub total: i64,
}

/// Refresh token plus an access token derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPairResponse {
    pub refresh_token: String,
    pub access_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HelloResponse {
    pub greeting: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub store_connected: bool,
}
