//! Generation backend trait and factory.
//!
//! The `GenerationBackend` trait abstracts over "generate text given a
//! system instruction, a user turn and sampling parameters".
//! Implementations:
//! - `GeminiBackend`: Google Generative Language API (`generateContent`)
//! - `OpenAIBackend`: OpenAI Chat Completions

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::providers::{GeminiBackend, OpenAIBackend};
use crate::types::{GenerationRequest, LLMProvider, ModelInfo};
use docsage_core::Result;

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Which provider this backend talks to.
    fn provider(&self) -> LLMProvider;

    /// Run one non-streaming generation and return the response text.
    /// Every failure is reported as `Error::Analysis`.
    async fn generate(&self, api_key: &str, request: &GenerationRequest) -> Result<String>;

    /// List the models visible to the credential.
    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>>;
}

/// Create the backend selected by the configuration.
pub fn create_backend(config: &ClientConfig) -> Result<Arc<dyn GenerationBackend>> {
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| docsage_core::Error::Internal(format!("HTTP client: {}", e)))?;

    let backend: Arc<dyn GenerationBackend> = match config.provider {
        LLMProvider::Gemini => Arc::new(GeminiBackend::new(http, config.endpoint())),
        LLMProvider::OpenAI => Arc::new(OpenAIBackend::new(http, config.endpoint())),
    };

    tracing::info!(
        "Using {} backend at {} (model={})",
        config.provider,
        config.endpoint(),
        config.model
    );
    Ok(backend)
}
