//! Analysis routes: per-session and one-shot.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use super::documents::NO_DOCUMENT_MESSAGE;
use super::ApiError;
use crate::state::AppState;

pub const MISSING_INSTRUCTION_MESSAGE: &str =
    "Please enter analysis instructions before proceeding.";

pub const DOCUMENT_REPLACED_MESSAGE: &str =
    "The document was replaced while the analysis was running. Please run the analysis again.";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions/{id}/analyze", post(analyze_session))
        .route("/analyze", post(analyze_text))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeSessionRequest {
    #[serde(default)]
    pub instruction: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeTextRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub prompt: String,
}

/// POST /api/sessions/:id/analyze — analyze the session's document.
async fn analyze_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AnalyzeSessionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let instruction = req.instruction.trim();
    if instruction.is_empty() {
        return Err(ApiError::bad_request(MISSING_INSTRUCTION_MESSAGE));
    }

    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ApiError::session_not_found(&id))?;
    let document = session
        .document
        .as_ref()
        .ok_or_else(|| ApiError::conflict(NO_DOCUMENT_MESSAGE))?;

    let report = state
        .analyzer
        .analyze_report(&document.extracted_text, instruction)
        .await?;

    info!(
        session = %id,
        truncated = report.truncated,
        sent_chars = report.sent_chars,
        "Analysis complete"
    );

    // The session may have been deleted, or its document replaced, while the
    // request was in flight.
    let recorded = state
        .sessions
        .update(&id, |s| s.record_analysis(&document.id, instruction, report.text.clone()))
        .ok_or_else(|| ApiError::session_not_found(&id))?;
    if !recorded {
        return Err(ApiError::conflict(DOCUMENT_REPLACED_MESSAGE));
    }

    Ok(Json(serde_json::json!({
        "analysis": report.text,
        "truncated": report.truncated,
        "provider": report.provider,
        "model": report.model,
    })))
}

/// POST /api/analyze — analyze text supplied in the request body.
async fn analyze_text(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeTextRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.text.trim().is_empty() || req.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("Missing required parameters: text and prompt"));
    }

    let analysis = state.analyzer.analyze(&req.text, req.prompt.trim()).await?;
    Ok(Json(serde_json::json!({ "analysis": analysis })))
}
