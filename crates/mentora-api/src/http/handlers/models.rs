//! Model catalog handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use mentora_types::ai::ModelInfo;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

/// `GET /api/v1/models` -- aggregate catalog across registered providers,
/// in fallback order.
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.router.available_models(),
    })
}
