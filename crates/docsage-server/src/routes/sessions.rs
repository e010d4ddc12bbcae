//! Session lifecycle, extracted text and analysis export.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use super::ApiError;
use crate::session::SessionSummary;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/text", get(get_text))
        .route("/sessions/{id}/export", get(export_analysis))
}

/// POST /api/sessions — start an empty session.
async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.sessions.create().ok_or_else(|| {
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Too many active sessions. Please try again later.",
        )
    })?;
    info!(session = %id, "Session created");
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "sessionId": id }))))
}

/// GET /api/sessions/:id
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ApiError::session_not_found(&id))?;
    Ok(Json(session.summary()))
}

/// DELETE /api/sessions/:id — drop the session and everything in it.
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.sessions.remove(&id) {
        return Err(ApiError::session_not_found(&id));
    }
    info!(session = %id, "Session deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// GET /api/sessions/:id/text — the full extracted text.
async fn get_text(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ApiError::session_not_found(&id))?;
    let document = session
        .document
        .as_ref()
        .ok_or_else(|| ApiError::conflict(super::documents::NO_DOCUMENT_MESSAGE))?;

    Ok(Json(serde_json::json!({
        "fileName": document.file_name,
        "format": document.format,
        "text": document.extracted_text,
        "characters": document.extracted_text.chars().count(),
        "textlessPages": document.textless_pages,
    })))
}

/// GET /api/sessions/:id/export — the last analysis as a text download.
async fn export_analysis(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ApiError::session_not_found(&id))?;
    let artifact = session
        .export_artifact()
        .ok_or_else(|| ApiError::conflict("No analysis to export yet. Run an analysis first."))?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe(&artifact.file_name)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.body,
    ))
}

/// Header values must be visible ASCII; quotes would end the filename early.
fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::tests::*;
    use super::header_safe;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use docsage_analyze::{ClientConfig, LLMProvider};
    use docsage_core::DocSageConfig;

    #[test]
    fn test_header_safe() {
        assert_eq!(header_safe("report_analysis.txt"), "report_analysis.txt");
        assert_eq!(header_safe("my \"q3\".txt"), "my _q3_.txt");
        assert_eq!(header_safe("résumé.txt"), "r_sum_.txt");
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let h = harness();
        let id = create_session(&h.app).await;

        let (status, body) = send_json(&h.app, get(&format!("/api/sessions/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessionId"], id.as_str());
        assert_eq!(body["hasText"], false);

        let delete = Request::delete(format!("/api/sessions/{}", id))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&h.app, delete).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send_json(&h.app, get(&format!("/api/sessions/{}", id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains(&id));
    }

    #[tokio::test]
    async fn test_session_cap_is_503() {
        let h = harness_with(
            ClientConfig::for_provider(LLMProvider::Gemini).with_api_key("k"),
            DocSageConfig {
                max_sessions: 1,
                ..Default::default()
            },
        );
        create_session(&h.app).await;

        let (status, body) =
            send_json(&h.app, post_json("/api/sessions", serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("Too many active sessions"));
        assert_eq!(h.state.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_text_and_export_before_upload_conflict() {
        let h = harness();
        let id = create_session(&h.app).await;

        let (status, _) = send(&h.app, get(&format!("/api/sessions/{}/text", id))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&h.app, get(&format!("/api/sessions/{}/export", id))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_export_after_analysis() {
        let h = harness();
        let id = create_session(&h.app).await;

        let status = upload_docx(&h.app, &id, "report.docx", &["Quarterly revenue grew."]).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &h.app,
            post_json(
                &format!("/api/sessions/{}/analyze", id),
                serde_json::json!({ "instruction": "Summarize" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let response = tower::ServiceExt::oneshot(
            h.app.clone(),
            get(&format!("/api/sessions/{}/export", id)),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"report_analysis.txt\""
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(body.to_vec()).unwrap(),
            "Analysis of: report.docx\n\nAnalysis Prompt: Summarize\n\nResults:\nAnalysis for: Summarize"
        );
    }
}
