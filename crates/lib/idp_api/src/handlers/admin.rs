//! Admin account handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use idp_core::models::Admin;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::ValidJson;
use crate::middleware::auth::AdminPrincipal;
use crate::models::{AdminSessionResponse, LoginRequest, RegisterAdminRequest, UpdateAdminRequest};
use crate::services::admin;

/// `POST /admin/register` — create an admin and return a session.
pub async fn register_handler(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RegisterAdminRequest>,
) -> AppResult<(StatusCode, Json<AdminSessionResponse>)> {
    let resp = admin::register(&state, body).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// `POST /admin/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> AppResult<Json<AdminSessionResponse>> {
    Ok(Json(admin::login(&state, body).await?))
}

/// `GET /admin/me`
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(admin_id)): Extension<AdminPrincipal>,
) -> AppResult<Json<Admin>> {
    Ok(Json(admin::profile(&state, &admin_id).await?))
}

/// `PATCH /admin/me` — change names and/or password.
pub async fn update_me_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(admin_id)): Extension<AdminPrincipal>,
    ValidJson(body): ValidJson<UpdateAdminRequest>,
) -> AppResult<Json<Admin>> {
    Ok(Json(admin::update(&state, &admin_id, body).await?))
}

/// `DELETE /admin/me` — delete the admin and everything it owns.
pub async fn delete_me_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(admin_id)): Extension<AdminPrincipal>,
) -> AppResult<StatusCode> {
    admin::delete(&state, &admin_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
