//! Public token exchange.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::ValidJson;
use crate::models::{AccessTokenRequest, AccessTokenResponse};
use crate::services::applications;

/// `POST /token/access` — refresh token in, access token out.
pub async fn access_token_handler(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<AccessTokenRequest>,
) -> AppResult<Json<AccessTokenResponse>> {
    Ok(Json(applications::exchange(&state, body).await?))
}
