//! Service status and model listing.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use super::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status))
        .route("/models", get(list_models))
}

/// GET /api/status — provider readiness and limits.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let llm = state.analyzer.config();

    Json(serde_json::json!({
        "provider": llm.provider.to_string(),
        "model": llm.model,
        "llmConfigured": llm.has_credential(),
        "maxInputChars": llm.max_input_chars,
        "maxUploadBytes": state.config.max_upload_bytes,
        "textlessPages": state.config.textless_pages.to_string(),
        "activeSessions": state.sessions.len(),
    }))
}

/// GET /api/models — models visible to the configured credential.
async fn list_models(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let models = state.analyzer.list_models().await?;
    Ok(Json(serde_json::json!({
        "provider": state.analyzer.config().provider.to_string(),
        "total": models.len(),
        "models": models,
    })))
}
