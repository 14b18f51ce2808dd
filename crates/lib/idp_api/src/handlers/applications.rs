//! Application handlers. All require an admin session; everything addressed
//! at one application is owner-only.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{ValidJson, ValidQuery};
use crate::middleware::auth::AdminPrincipal;
use crate::models::{
    ApplicationListResponse, ApplicationResponse, CreateApplicationRequest, PaginationQuery,
    TokenPairResponse, UpdateApplicationRequest,
};
use crate::services::applications;

/// `POST /applications`
pub async fn create_application_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(admin_id)): Extension<AdminPrincipal>,
    ValidJson(body): ValidJson<CreateApplicationRequest>,
) -> AppResult<(StatusCode, Json<ApplicationResponse>)> {
    let app = applications::create(&state, &admin_id, body).await?;
    Ok((StatusCode::CREATED, Json(app)))
}

/// `GET /applications?offset=&limit=`
pub async fn list_applications_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(admin_id)): Extension<AdminPrincipal>,
    ValidQuery(query): ValidQuery<PaginationQuery>,
) -> AppResult<Json<ApplicationListResponse>> {
    Ok(Json(applications::list(&state, &admin_id, query).await?))
}

/// `GET /applications/{applicationID}`
pub async fn get_application_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(admin_id)): Extension<AdminPrincipal>,
    Path(application_id): Path<String>,
) -> AppResult<Json<ApplicationResponse>> {
    Ok(Json(
        applications::get(&state, &admin_id, &application_id).await?,
    ))
}

/// `PATCH /applications/{applicationID}`
pub async fn update_application_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(admin_id)): Extension<AdminPrincipal>,
    Path(application_id): Path<String>,
    ValidJson(body): ValidJson<UpdateApplicationRequest>,
) -> AppResult<Json<ApplicationResponse>> {
    let app = applications::update(&state, &admin_id, &application_id, body).await?;
    Ok(Json(app))
}

/// `DELETE /applications/{applicationID}`
pub async fn delete_application_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(admin_id)): Extension<AdminPrincipal>,
    Path(application_id): Path<String>,
) -> AppResult<StatusCode> {
    applications::delete(&state, &admin_id, &application_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /applications/{applicationID}/refresh-token` — first issue.
pub async fn issue_refresh_token_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(admin_id)): Extension<AdminPrincipal>,
    Path(application_id): Path<String>,
) -> AppResult<(StatusCode, Json<TokenPairResponse>)> {
    let pair = applications::issue_tokens(&state, &admin_id, &application_id).await?;
    Ok((StatusCode::CREATED, Json(pair)))
}

/// `PUT /applications/{applicationID}/refresh-token` — rotate.
pub async fn rotate_refresh_token_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(admin_id)): Extension<AdminPrincipal>,
    Path(application_id): Path<String>,
) -> AppResult<Json<TokenPairResponse>> {
    let pair = applications::rotate_tokens(&state, &admin_id, &application_id).await?;
    Ok(Json(pair))
}

/// `DELETE /applications/{applicationID}/refresh-token` — revoke.
pub async fn revoke_refresh_token_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(admin_id)): Extension<AdminPrincipal>,
    Path(application_id): Path<String>,
) -> AppResult<Json<ApplicationResponse>> {
    let app = applications::revoke_tokens(&state, &admin_id, &application_id).await?;
    Ok(Json(app))
}
