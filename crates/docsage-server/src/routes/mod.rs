//! HTTP route handlers. Every route lives under `/api`.

pub mod analysis;
pub mod documents;
pub mod sessions;
pub mod status;

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use docsage_core::Error;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .nest("/api", api_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(status::routes())
        .merge(sessions::routes())
        .merge(documents::routes())
        .merge(analysis::routes())
}

/// An error response: a status code and a `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn session_not_found(id: &str) -> Self {
        Error::NotFound(format!("session {}", id)).into()
    }
}

/// Status code for each error kind.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Analysis(_) => StatusCode::BAD_GATEWAY,
        Error::UnsupportedFormat(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Io(_) | Error::Json(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::new(status_for(&err), err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(status = %self.status, "{}", self.message);
        }
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use docsage_analyze::{
        AnalysisClient, ClientConfig, GenerationBackend, GenerationRequest, LLMProvider,
        ModelInfo,
    };
    use docsage_core::{DocSageConfig, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Echoes the instruction back so handlers can be checked end to end.
    pub(crate) struct EchoBackend {
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationBackend for EchoBackend {
        fn provider(&self) -> LLMProvider {
            LLMProvider::Gemini
        }

        async fn generate(&self, _api_key: &str, request: &GenerationRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let instruction = request
                .user_content
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("User instructions: ");
            Ok(format!("Analysis for: {}", instruction))
        }

        async fn list_models(&self, _api_key: &str) -> Result<Vec<ModelInfo>> {
            Ok(vec![ModelInfo {
                name: "models/gemini-1.5-flash".into(),
                display_name: Some("Gemini 1.5 Flash".into()),
                supported_methods: vec!["generateContent".into()],
            }])
        }
    }

    pub(crate) struct Harness {
        pub app: Router,
        pub state: Arc<AppState>,
        pub backend: Arc<EchoBackend>,
    }

    /// Router and state around an arbitrary backend.
    pub(crate) fn build_app(
        backend: Arc<dyn GenerationBackend>,
        client_config: ClientConfig,
        config: DocSageConfig,
    ) -> (Router, Arc<AppState>) {
        let analyzer = AnalysisClient::with_backend(client_config, backend);
        let state = Arc::new(AppState::new(config, analyzer));
        (build_router(state.clone()), state)
    }

    pub(crate) fn harness_with(client_config: ClientConfig, config: DocSageConfig) -> Harness {
        let backend = Arc::new(EchoBackend {
            calls: AtomicUsize::new(0),
        });
        let (app, state) = build_app(backend.clone(), client_config, config);
        Harness {
            app,
            state,
            backend,
        }
    }

    pub(crate) fn harness() -> Harness {
        harness_with(
            ClientConfig::for_provider(LLMProvider::Gemini).with_api_key("test-key"),
            DocSageConfig::default(),
        )
    }

    pub(crate) async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    pub(crate) async fn send_json(
        app: &Router,
        request: Request<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let (status, body) = send(app, request).await;
        let value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    pub(crate) fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    pub(crate) fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub(crate) fn multipart_upload(uri: &str, file_name: &str, payload: &[u8]) -> Request<Body> {
        let boundary = "docsage-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                b = boundary,
                f = file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    pub(crate) async fn create_session(app: &Router) -> String {
        let (status, body) =
            send_json(app, post_json("/api/sessions", serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::CREATED);
        body["sessionId"].as_str().unwrap().to_string()
    }

    pub(crate) async fn upload_docx(
        app: &Router,
        session_id: &str,
        file_name: &str,
        paragraphs: &[&str],
    ) -> StatusCode {
        let uri = format!("/api/sessions/{}/document", session_id);
        let payload = docx_payload(paragraphs);
        send(app, multipart_upload(&uri, file_name, &payload)).await.0
    }

    /// A small DOCX with the given body paragraphs.
    pub(crate) fn docx_payload(paragraphs: &[&str]) -> Vec<u8> {
        let mut doc = docx_rs::Docx::new();
        for text in paragraphs {
            doc = doc.add_paragraph(
                docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*text)),
            );
        }
        let mut cursor = std::io::Cursor::new(Vec::new());
        doc.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::Extraction("x".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(&Error::Config("x".into())), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(&Error::Analysis("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&Error::UnsupportedFormat("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&Error::Internal("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::session_not_found("abc").status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let h = harness();
        let (status, _) = send(&h.app, get("/api/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
