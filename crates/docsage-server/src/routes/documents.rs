//! Document upload: stage, extract, keep the text in the session.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tracing::info;

use super::ApiError;
use crate::session::{preview, SessionDocument};
use crate::state::AppState;
use docsage_core::Error;
use docsage_extract::Format;

/// Shown when a document yields no text at all.
pub const EMPTY_EXTRACTION_MESSAGE: &str = "Could not extract text from the document. The file might be encrypted, damaged, or contain only images.";

pub const UNSUPPORTED_FORMAT_MESSAGE: &str =
    "Unsupported file format. Please upload a PDF or DOCX file.";

pub const NO_DOCUMENT_MESSAGE: &str = "No document in this session. Upload a document first.";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/sessions/{id}/document", post(upload_document))
}

/// One uploaded file as received.
struct Upload {
    file_name: String,
    bytes: axum::body::Bytes,
}

/// POST /api/sessions/:id/document — multipart field `file`, optional
/// `password` for encrypted PDFs.
async fn upload_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.sessions.contains(&id) {
        return Err(ApiError::session_not_found(&id));
    }

    let mut upload: Option<Upload> = None;
    let mut password: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "password" {
            password = Some(field.text().await?).filter(|p| !p.is_empty());
            continue;
        }
        let Some(file_name) = field.file_name().map(|n| n.to_string()) else {
            continue;
        };
        if upload.is_none() {
            let bytes = field.bytes().await?;
            upload = Some(Upload { file_name, bytes });
        }
    }

    let upload = upload.ok_or_else(|| ApiError::bad_request("No file part in the request"))?;
    if upload.file_name.trim().is_empty() {
        return Err(ApiError::bad_request("No file selected"));
    }
    if upload.bytes.len() > state.config.max_upload_bytes {
        return Err(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "File exceeds the upload limit of {} bytes",
                state.config.max_upload_bytes
            ),
        ));
    }

    let format = Format::from_file_name(&upload.file_name)
        .ok_or_else(|| ApiError::bad_request(UNSUPPORTED_FORMAT_MESSAGE))?;
    format.check_payload(&upload.bytes)?;

    let size_bytes = upload.bytes.len();
    let options = state.extract_options(password);
    let bytes = upload.bytes;
    let extracted = tokio::task::spawn_blocking(move || {
        docsage_extract::extract_with(&bytes, format, &options)
    })
    .await
    .map_err(|e| Error::Internal(format!("extraction task failed: {}", e)))??;

    if extracted.is_blank() {
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            EMPTY_EXTRACTION_MESSAGE,
        ));
    }

    let word_count = extracted.word_count();
    let characters = extracted.text.chars().count();
    let text_preview = preview(&extracted.text, state.config.preview_chars);
    let textless_pages = extracted.textless_pages.clone();

    let document = SessionDocument {
        id: uuid::Uuid::new_v4().to_string(),
        file_name: upload.file_name.clone(),
        format,
        size_bytes,
        extracted_text: extracted.text,
        textless_pages: extracted.textless_pages,
    };
    state
        .sessions
        .update(&id, |session| session.load_document(document))
        .ok_or_else(|| ApiError::session_not_found(&id))?;

    info!(
        session = %id,
        %format,
        size_bytes,
        characters,
        word_count,
        "Document loaded"
    );

    Ok(Json(serde_json::json!({
        "fileName": upload.file_name,
        "format": format,
        "sizeKb": kilobytes(size_bytes),
        "wordCount": word_count,
        "characters": characters,
        "preview": text_preview,
        "textlessPages": textless_pages,
    })))
}

/// Size in KB, rounded to two decimals.
fn kilobytes(bytes: usize) -> f64 {
    (bytes as f64 / 1024.0 * 100.0).round() / 100.0
}
