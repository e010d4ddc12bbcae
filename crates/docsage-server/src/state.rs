//! Shared application state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use docsage_analyze::AnalysisClient;
use docsage_core::DocSageConfig;
use docsage_extract::ExtractOptions;
use tracing::info;

use crate::session::SessionStore;

/// How often idle sessions are looked for.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: DocSageConfig,
    pub analyzer: AnalysisClient,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: DocSageConfig, analyzer: AnalysisClient) -> Self {
        let sessions = SessionStore::new(
            Duration::from_secs(config.session_idle_secs),
            config.max_sessions,
        );
        Self {
            config,
            analyzer,
            sessions,
        }
    }

    /// Extraction options derived from the server configuration.
    pub fn extract_options(&self, pdf_password: Option<String>) -> ExtractOptions {
        ExtractOptions {
            pdf_password,
            textless_pages: self.config.textless_pages,
            staging_dir: self.config.staging_dir.clone(),
        }
    }
}

/// Periodically drop sessions that have been idle past the timeout.
pub fn start_session_sweeper(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let dropped = state.sessions.sweep_idle(Instant::now());
            if dropped > 0 {
                info!(dropped, remaining = state.sessions.len(), "Swept idle sessions");
            }
        }
    });
}
