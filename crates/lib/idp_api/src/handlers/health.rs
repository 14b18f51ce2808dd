//! Liveness and store health endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::warn;

use crate::AppState;
use crate::models::{HealthResponse, HelloResponse};

/// `GET /` — greeting with the running version.
pub async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        greeting: format!("idp {}", idp_core::version()),
    })
}

/// `GET /health` — 200 when the credential store answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.store.health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".into(),
                store_connected: true,
            }),
        ),
        Err(e) => {
            warn!("store health check failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable".into(),
                    store_connected: false,
                }),
            )
        }
    }
}
