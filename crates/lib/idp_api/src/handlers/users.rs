//! User handlers.
//!
//! Everything except `/users/me` is called by an application backend holding
//! an access token; `/users/me` is called by the user with their own session.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use idp_core::models::User;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{ValidJson, ValidQuery};
use crate::middleware::auth::{ApplicationPrincipal, UserSession};
use crate::models::{
    CreateUserRequest, PaginationQuery, UpdateUserRequest, UserListResponse, UserLoginRequest,
    UserSessionResponse,
};
use crate::services::users;

/// `POST /users`
pub async fn create_user_handler(
    State(state): State<AppState>,
    Extension(ApplicationPrincipal(app_id)): Extension<ApplicationPrincipal>,
    ValidJson(body): ValidJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserSessionResponse>)> {
    let resp = users::create(&state, &app_id, body).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// `POST /users/login`
pub async fn login_user_handler(
    State(state): State<AppState>,
    Extension(ApplicationPrincipal(app_id)): Extension<ApplicationPrincipal>,
    ValidJson(body): ValidJson<UserLoginRequest>,
) -> AppResult<Json<UserSessionResponse>> {
    Ok(Json(users::login(&state, &app_id, body).await?))
}

/// `GET /applications/{applicationID}/users?offset=&limit=`
pub async fn list_users_handler(
    State(state): State<AppState>,
    Extension(ApplicationPrincipal(app_id)): Extension<ApplicationPrincipal>,
    Path(application_id): Path<String>,
    ValidQuery(query): ValidQuery<PaginationQuery>,
) -> AppResult<Json<UserListResponse>> {
    Ok(Json(
        users::list(&state, &app_id, &application_id, query).await?,
    ))
}

/// `GET /applications/{applicationID}/users/{userID}`
pub async fn get_user_handler(
    State(state): State<AppState>,
    Extension(ApplicationPrincipal(app_id)): Extension<ApplicationPrincipal>,
    Path((application_id, user_id)): Path<(String, String)>,
) -> AppResult<Json<User>> {
    Ok(Json(
        users::get(&state, &app_id, &application_id, &user_id).await?,
    ))
}

/// `PATCH /applications/{applicationID}/users/{userID}`
pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(ApplicationPrincipal(app_id)): Extension<ApplicationPrincipal>,
    Path((application_id, user_id)): Path<(String, String)>,
    ValidJson(body): ValidJson<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    let user = users::update(&state, &app_id, &application_id, &user_id, body).await?;
    Ok(Json(user))
}

/// `DELETE /applications/{applicationID}/users/{userID}`
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(ApplicationPrincipal(app_id)): Extension<ApplicationPrincipal>,
    Path((application_id, user_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    users::delete(&state, &app_id, &application_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /users/me`
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(UserSession(principal)): Extension<UserSession>,
) -> AppResult<Json<User>> {
    Ok(Json(users::me(&state, &principal).await?))
}
