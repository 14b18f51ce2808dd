//! End users inside an application.
//!
//! Callers authenticate with the application's access token; the principal is
//! the application itself, and every target application id, whether it comes
//! from the path or the body, must match it.

use idp_core::auth::UserPrincipal;
use idp_core::auth::guard::ensure_tenant;
use idp_core::models::{NewUser, PageRequest, User, UserPatch};
use tracing::{debug, info};

use super::{hash_password, normalize_email, trimmed, verify_decoy, verify_password};
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateUserRequest, PaginationQuery, UpdateUserRequest, UserListResponse, UserLoginRequest,
    UserSessionResponse,
};

/// Register a user under the calling application and open a session.
pub async fn create(
    state: &AppState,
    principal_application_id: &str,
    req: CreateUserRequest,
) -> AppResult<UserSessionResponse> {
    if let Some(target) = req.application_id.as_deref().map(str::trim)
        && !target.is_empty()
    {
        ensure_tenant(principal_application_id, target)?;
    }

    let password_hash = hash_password(state.hasher, req.password).await?;
    let user = state
        .store
        .create_user(NewUser {
            email: normalize_email(&req.email),
            password_hash,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            application_id: principal_application_id.to_string(),
        })
        .await?;

    let token = state.keys.user.issue(&user)?;
    info!(application_id = principal_application_id, user_id = %user.id, "user registered");
    Ok(UserSessionResponse { user, token })
}

/// Authenticate a user of the calling application.
pub async fn login(
    state: &AppState,
    principal_application_id: &str,
    req: UserLoginRequest,
) -> AppResult<UserSessionResponse> {
    let application_id = req.application_id.trim();
    ensure_tenant(principal_application_id, application_id)?;

    let email = normalize_email(&req.email);
    let Some(found) = state.store.find_user_by_email(application_id, &email).await? else {
        debug!(application_id, "user login failed: unknown email");
        verify_decoy(state, req.password).await?;
        return Err(invalid_credentials());
    };
    if !verify_password(state.hasher, req.password, found.password_hash).await? {
        debug!(application_id, user_id = %found.user.id, "user login failed: wrong password");
        return Err(invalid_credentials());
    }

    let token = state.keys.user.issue(&found.user)?;
    info!(application_id, user_id = %found.user.id, "user logged in");
    Ok(UserSessionResponse {
        user: found.user,
        token,
    })
}

pub async fn list(
    state: &AppState,
    principal_application_id: &str,
    application_id: &str,
    query: PaginationQuery,
) -> AppResult<UserListResponse> {
    ensure_tenant(principal_application_id, application_id)?;
    let page = state
        .store
        .list_users(application_id, PageRequest::new(query.offset, query.limit))
        .await?;
    Ok(UserListResponse {
        users: page.items,
        total: page.total,
    })
}

pub async fn get(
    state: &AppState,
    principal_application_id: &str,
    application_id: &str,
    user_id: &str,
) -> AppResult<User> {
    ensure_tenant(principal_application_id, application_id)?;
    find(state, application_id, user_id).await
}

pub async fn update(
    state: &AppState,
    principal_application_id: &str,
    application_id: &str,
    user_id: &str,
    req: UpdateUserRequest,
) -> AppResult<User> {
    ensure_tenant(principal_application_id, application_id)?;
    let password_hash = match req.password {
        Some(password) => Some(hash_password(state.hasher, password).await?),
        None => None,
    };
    let user = state
        .store
        .update_user(
            application_id,
            user_id,
            UserPatch {
                first_name: trimmed(req.first_name),
                last_name: trimmed(req.last_name),
                password_hash,
            },
        )
        .await?;
    info!(application_id, user_id, "user updated");
    Ok(user)
}

pub async fn delete(
    state: &AppState,
    principal_application_id: &str,
    application_id: &str,
    user_id: &str,
) -> AppResult<()> {
    ensure_tenant(principal_application_id, application_id)?;
    state.store.delete_user(application_id, user_id).await?;
    info!(application_id, user_id, "user deleted");
    Ok(())
}

/// The user behind a user session token.
pub async fn me(state: &AppState, principal: &UserPrincipal) -> AppResult<User> {
    find(state, &principal.application_id, &principal.user_id).await
}

async fn find(state: &AppState, application_id: &str, user_id: &str) -> AppResult<User> {
    state
        .store
        .get_user(application_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".into())
}
