//! Admin registration, login and self-management.

use idp_core::models::{Admin, AdminPatch, NewAdmin};
use tracing::{debug, info};

use super::{hash_password, normalize_email, trimmed, verify_decoy, verify_password};
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminSessionResponse, LoginRequest, RegisterAdminRequest, UpdateAdminRequest,
};

/// Create an admin and open a session for it.
pub async fn register(state: &AppState, req: RegisterAdminRequest) -> AppResult<AdminSessionResponse> {
    let password_hash = hash_password(state.hasher, req.password).await?;
    let admin = state
        .store
        .create_admin(NewAdmin {
            email: normalize_email(&req.email),
            password_hash,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
        })
        .await?;

    let token = state.keys.admin.issue(&admin)?;
    info!(admin_id = %admin.id, "admin registered");
    Ok(AdminSessionResponse { admin, token })
}

/// Authenticate with email + password.
///
/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<AdminSessionResponse> {
    let email = normalize_email(&req.email);
    let Some(found) = state.store.find_admin_by_email(&email).await? else {
        debug!("admin login failed: unknown email");
        verify_decoy(state, req.password).await?;
        return Err(invalid_credentials());
    };
    if !verify_password(state.hasher, req.password, found.password_hash).await? {
        debug!(admin_id = %found.admin.id, "admin login failed: wrong password");
        return Err(invalid_credentials());
    }

    let token = state.keys.admin.issue(&found.admin)?;
    info!(admin_id = %found.admin.id, "admin logged in");
    Ok(AdminSessionResponse {
        admin: found.admin,
        token,
    })
}

/// Load the admin behind a session. A token can outlive its admin.
pub async fn profile(state: &AppState, admin_id: &str) -> AppResult<Admin> {
    state
        .store
        .get_admin(admin_id)
        .await?
        .ok_or_else(|| AppError::NotFound("admin not found".into()))
}

pub async fn update(state: &AppState, admin_id: &str, req: UpdateAdminRequest) -> AppResult<Admin> {
    let password_hash = match req.password {
        Some(password) => Some(hash_password(state.hasher, password).await?),
        None => None,
    };
    let admin = state
        .store
        .update_admin(
            admin_id,
            AdminPatch {
                first_name: trimmed(req.first_name),
                last_name: trimmed(req.last_name),
                password_hash,
            },
        )
        .await?;
    info!(admin_id, "admin updated");
    Ok(admin)
}

/// Delete the admin together with its applications and their users.
pub async fn delete(state: &AppState, admin_id: &str) -> AppResult<()> {
    state.store.delete_admin(admin_id).await?;
    info!(admin_id, "admin deleted");
    Ok(())
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".into())
}
