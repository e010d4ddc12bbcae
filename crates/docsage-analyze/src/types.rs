//! Analysis request/response types.

use serde::{Deserialize, Serialize};

use docsage_core::Error;

/// LLM provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    Gemini,
    OpenAI,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::OpenAI => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(LLMProvider::Gemini),
            "openai" => Ok(LLMProvider::OpenAI),
            other => Err(Error::Config(format!("Unknown provider: {}", other))),
        }
    }
}

/// Sampling parameters forwarded untouched to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
    #[serde(rename = "topP")]
    pub top_p: f64,
    #[serde(rename = "topK")]
    pub top_k: u32,
}

/// One generation call: a fixed system instruction and a single user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: String,
    pub user_content: String,
    pub sampling: SamplingParams,
}

/// Outcome of an analysis, with the bookkeeping the caller may display.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Model output, with the truncation notice appended when applicable.
    pub text: String,
    pub truncated: bool,
    /// Characters in the document text handed to the client.
    #[serde(rename = "inputChars")]
    pub input_chars: usize,
    /// Characters of document text actually sent to the backend.
    #[serde(rename = "sentChars")]
    pub sent_chars: usize,
    pub provider: LLMProvider,
    pub model: String,
}

/// A model visible to the configured credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "supportedMethods", default)]
    pub supported_methods: Vec<String>,
}
