//! Credential store: durable admins, applications and users.
//!
//! Every method is atomic on its own. Multi-step sequences the identity
//! model depends on (uniqueness check + insert, refresh-token check +
//! persist, rotation) are single methods so that each backend can run them
//! inside one transaction.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Admin, AdminPatch, AdminWithPassword, Application, ApplicationPatch, NewAdmin,
    NewApplication, NewUser, Page, PageRequest, User, UserPatch, UserWithPassword,
};

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),
}

/// How a refresh token write treats an already persisted token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenWrite {
    /// Fail with `Conflict` if the application already has a live token.
    IssueNew,
    /// Clear whatever is there and persist the new token, atomically.
    Rotate,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Cheap liveness probe.
    async fn health(&self) -> Result<(), StoreError>;

    // Admins
    async fn create_admin(&self, new_admin: NewAdmin) -> Result<Admin, StoreError>;
    async fn get_admin(&self, id: &str) -> Result<Option<Admin>, StoreError>;
    async fn find_admin_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AdminWithPassword>, StoreError>;
    async fn update_admin(&self, id: &str, patch: AdminPatch) -> Result<Admin, StoreError>;
    /// Deletes the admin and, by cascade, its applications and their users.
    async fn delete_admin(&self, id: &str) -> Result<(), StoreError>;

    // Applications
    async fn create_application(
        &self,
        new_application: NewApplication,
    ) -> Result<Application, StoreError>;
    async fn get_application(&self, id: &str) -> Result<Option<Application>, StoreError>;
    async fn list_applications(
        &self,
        admin_id: &str,
        page: PageRequest,
    ) -> Result<Page<Application>, StoreError>;
    async fn update_application(
        &self,
        id: &str,
        patch: ApplicationPatch,
    ) -> Result<Application, StoreError>;
    /// Deletes the application and, by cascade, its users.
    async fn delete_application(&self, id: &str) -> Result<(), StoreError>;
    async fn store_refresh_token(
        &self,
        application_id: &str,
        token: &str,
        mode: RefreshTokenWrite,
    ) -> Result<Application, StoreError>;
    async fn clear_refresh_token(&self, application_id: &str) -> Result<Application, StoreError>;

    // Users, always addressed within their application
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;
    async fn get_user(
        &self,
        application_id: &str,
        user_id: &str,
    ) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(
        &self,
        application_id: &str,
        email: &str,
    ) -> Result<Option<UserWithPassword>, StoreError>;
    async fn list_users(
        &self,
        application_id: &str,
        page: PageRequest,
    ) -> Result<Page<User>, StoreError>;
    async fn update_user(
        &self,
        application_id: &str,
        user_id: &str,
        patch: UserPatch,
    ) -> Result<User, StoreError>;
    async fn delete_user(&self, application_id: &str, user_id: &str) -> Result<(), StoreError>;
}

pub(crate) fn admin_not_found(id: &str) -> StoreError {
    StoreError::NotFound(format!("admin {id}"))
}

pub(crate) fn application_not_found(id: &str) -> StoreError {
    StoreError::NotFound(format!("application {id}"))
}

pub(crate) fn user_not_found(id: &str) -> StoreError {
    StoreError::NotFound(format!("user {id}"))
}

pub(crate) fn refresh_token_exists(application_id: &str) -> StoreError {
    StoreError::Conflict(format!(
        "application {application_id} already has a refresh token"
    ))
}
