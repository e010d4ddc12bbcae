//! The analysis client: credential check, truncation and request assembly.

use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::{create_backend, GenerationBackend};
use crate::config::ClientConfig;
use crate::types::{AnalysisReport, GenerationRequest, ModelInfo};
use docsage_core::{Error, Result};

/// Fixed instruction sent ahead of every user turn.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert document analyst. Your task is to analyze documents and provide insights based on user instructions. Focus only on the content provided and avoid making assumptions beyond what's in the text. Structure your analysis clearly with appropriate headings, bullet points, or paragraphs. If the user asks for a summary, ensure it captures the key points while significantly reducing length.";

/// Appended to the result when the document text was cut to fit.
pub const TRUNCATION_NOTICE: &str = "\n\n[Note: The document was truncated due to length limitations. Analysis is based on the first portion of the document.]";

/// Sends documents to the configured backend for analysis.
#[derive(Clone)]
pub struct AnalysisClient {
    config: ClientConfig,
    backend: Arc<dyn GenerationBackend>,
}

impl AnalysisClient {
    /// Build a client with the backend selected by `config.provider`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let backend = create_backend(&config)?;
        Ok(Self { config, backend })
    }

    /// Build a client around an existing backend.
    pub fn with_backend(config: ClientConfig, backend: Arc<dyn GenerationBackend>) -> Self {
        if backend.provider() != config.provider {
            warn!(
                "Backend provider {} differs from configured provider {}",
                backend.provider(),
                config.provider
            );
        }
        Self { config, backend }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Analyze `text` according to `instruction` and return the model's prose.
    pub async fn analyze(&self, text: &str, instruction: &str) -> Result<String> {
        self.analyze_report(text, instruction)
            .await
            .map(|report| report.text)
    }

    /// Like [`analyze`](Self::analyze), with truncation bookkeeping.
    pub async fn analyze_report(&self, text: &str, instruction: &str) -> Result<AnalysisReport> {
        let api_key = self.config.credential()?;

        let input_chars = text.chars().count();
        let (sent, truncated) = truncate_chars(text, self.config.max_input_chars);
        let sent_chars = if truncated {
            self.config.max_input_chars
        } else {
            input_chars
        };

        let request = GenerationRequest {
            model: self.config.model.clone(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            user_content: build_user_content(instruction, sent),
            sampling: self.config.sampling(),
        };

        info!(
            provider = %self.config.provider,
            model = %self.config.model,
            input_chars,
            sent_chars,
            truncated,
            "Requesting document analysis"
        );

        let mut analysis = self.backend.generate(api_key, &request).await?;
        if truncated {
            analysis.push_str(TRUNCATION_NOTICE);
        }

        Ok(AnalysisReport {
            text: analysis,
            truncated,
            input_chars,
            sent_chars,
            provider: self.config.provider,
            model: self.config.model.clone(),
        })
    }

    /// Models available to the configured credential.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let api_key = self.config.credential()?;
        self.backend.list_models(api_key).await
    }
}

/// First `max_chars` characters of `text`, and whether anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

/// The single user turn: the instruction, then the document.
pub fn build_user_content(instruction: &str, document: &str) -> String {
    format!(
        "User instructions: {}\n\nDocument content:\n{}",
        instruction, document
    )
}

impl std::fmt::Debug for AnalysisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisClient")
            .field("config", &self.config)
            .field("backend", &self.backend.provider())
            .finish()
    }
}
