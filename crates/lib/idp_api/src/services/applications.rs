//! Application management and the refresh/access token lifecycle.
//!
//! Every operation addressed at a specific application first runs the
//! ownership guard against the calling admin.

use idp_core::auth::application::ACCESS_TOKEN_EXPIRY_SECS;
use idp_core::auth::guard::ensure_owner;
use idp_core::auth::jwt::{fingerprint, tokens_match};
use idp_core::models::{Application, ApplicationPatch, NewApplication, PageRequest};
use idp_core::store::RefreshTokenWrite;
use tracing::{debug, info};

use super::trimmed;
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    AccessTokenRequest, AccessTokenResponse, ApplicationListResponse, ApplicationResponse,
    CreateApplicationRequest, PaginationQuery, TokenPairResponse, UpdateApplicationRequest,
};

const TOKEN_TYPE: &str = "Bearer";

pub async fn create(
    state: &AppState,
    admin_id: &str,
    req: CreateApplicationRequest,
) -> AppResult<ApplicationResponse> {
    let app = state
        .store
        .create_application(NewApplication {
            name: req.name.trim().to_string(),
            description: req.description.trim().to_string(),
            admin_id: admin_id.to_string(),
        })
        .await?;
    info!(admin_id, application_id = %app.id, "application created");
    Ok(app.into())
}

/// One page of the admin's own applications.
pub async fn list(
    state: &AppState,
    admin_id: &str,
    query: PaginationQuery,
) -> AppResult<ApplicationListResponse> {
    let page = state
        .store
        .list_applications(admin_id, PageRequest::new(query.offset, query.limit))
        .await?
        .map(ApplicationResponse::from);
    Ok(ApplicationListResponse {
        applications: page.items,
        total: page.total,
    })
}

pub async fn get(state: &AppState, admin_id: &str, application_id: &str) -> AppResult<ApplicationResponse> {
    let app = ensure_owner(state.store.as_ref(), admin_id, application_id).await?;
    Ok(app.into())
}

pub async fn update(
    state: &AppState,
    admin_id: &str,
    application_id: &str,
    req: UpdateApplicationRequest,
) -> AppResult<ApplicationResponse> {
    ensure_owner(state.store.as_ref(), admin_id, application_id).await?;
    let app = state
        .store
        .update_application(
            application_id,
            ApplicationPatch {
                name: trimmed(req.name),
                description: trimmed(req.description),
            },
        )
        .await?;
    info!(admin_id, application_id, "application updated");
    Ok(app.into())
}

/// Delete an application and, with it, all of its users.
pub async fn delete(state: &AppState, admin_id: &str, application_id: &str) -> AppResult<()> {
    ensure_owner(state.store.as_ref(), admin_id, application_id).await?;
    state.store.delete_application(application_id).await?;
    info!(admin_id, application_id, "application deleted");
    Ok(())
}

/// Issue the first refresh token. Conflicts while a live one exists.
pub async fn issue_tokens(
    state: &AppState,
    admin_id: &str,
    application_id: &str,
) -> AppResult<TokenPairResponse> {
    let app = ensure_owner(state.store.as_ref(), admin_id, application_id).await?;
    if app.has_refresh_token() {
        return Err(AppError::Conflict(
            "application already has a refresh token; revoke or rotate it".into(),
        ));
    }
    let pair = persist_new_pair(state, &app, RefreshTokenWrite::IssueNew).await?;
    info!(admin_id, application_id, "refresh token issued");
    Ok(pair)
}

/// Replace whatever refresh token is live with a new one, atomically.
pub async fn rotate_tokens(
    state: &AppState,
    admin_id: &str,
    application_id: &str,
) -> AppResult<TokenPairResponse> {
    let app = ensure_owner(state.store.as_ref(), admin_id, application_id).await?;
    let pair = persist_new_pair(state, &app, RefreshTokenWrite::Rotate).await?;
    info!(admin_id, application_id, "refresh token rotated");
    Ok(pair)
}

/// Clear the persisted refresh token. Already-issued access tokens remain
/// valid until they expire.
pub async fn revoke_tokens(
    state: &AppState,
    admin_id: &str,
    application_id: &str,
) -> AppResult<ApplicationResponse> {
    ensure_owner(state.store.as_ref(), admin_id, application_id).await?;
    let app = state.store.clear_refresh_token(application_id).await?;
    info!(admin_id, application_id, "refresh token revoked");
    Ok(app.into())
}

/// Trade the application's current refresh token for a fresh access token.
pub async fn exchange(state: &AppState, req: AccessTokenRequest) -> AppResult<AccessTokenResponse> {
    let presented = req.refresh_token.trim();
    let claims = state
        .keys
        .application
        .verify_refresh_token(presented)
        .map_err(|e| {
            debug!(token = %fingerprint(presented), error = %e, "refresh token rejected");
            AppError::Unauthorized("Invalid or expired refresh token".into())
        })?;

    let app = state.store.get_application(&claims.application_id).await?;
    let current = app
        .as_ref()
        .and_then(|app| app.refresh_token.as_deref())
        .is_some_and(|persisted| tokens_match(persisted, presented));
    if !current {
        debug!(
            token = %fingerprint(presented),
            application_id = %claims.application_id,
            "refresh token is not the application's current one"
        );
        return Err(AppError::Unauthorized(
            "Invalid or expired refresh token".into(),
        ));
    }

    let access_token = state.keys.application.derive_access_token(presented)?;
    debug!(application_id = %claims.application_id, "access token exchanged");
    Ok(AccessTokenResponse {
        access_token,
        token_type: TOKEN_TYPE.into(),
        expires_in: ACCESS_TOKEN_EXPIRY_SECS,
    })
}

async fn persist_new_pair(
    state: &AppState,
    app: &Application,
    mode: RefreshTokenWrite,
) -> AppResult<TokenPairResponse> {
    let refresh_token = state.keys.application.issue_refresh_token(&app.id)?;
    state
        .store
        .store_refresh_token(&app.id, &refresh_token, mode)
        .await?;
    let access_token = state.keys.application.derive_access_token(&refresh_token)?;
    Ok(TokenPairResponse {
        refresh_token,
        access_token,
        token_type: TOKEN_TYPE.into(),
        expires_in: ACCESS_TOKEN_EXPIRY_SECS,
    })
}
