//! Liveness handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub providers: Vec<String>,
}

/// `GET /api/v1/health` -- process liveness plus the registered fallback
/// chain. Per-provider reachability is a vendor call and is not probed on
/// this path.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        providers: state.router.provider_names().to_vec(),
    })
}
