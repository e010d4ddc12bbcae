//! Analysis client configuration and per-provider defaults.

use serde::{Deserialize, Serialize};

use crate::types::{LLMProvider, SamplingParams};
use docsage_core::{Error, Result};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Roughly the token budget of each provider at ~4 chars per token.
pub const GEMINI_MAX_INPUT_CHARS: usize = 30_000;
pub const OPENAI_MAX_INPUT_CHARS: usize = 32_000;

pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4000;
pub const DEFAULT_TOP_K: u32 = 40;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Everything the analysis client needs. Built once and passed in; the
/// client never consults the process environment.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub provider: LLMProvider,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub max_input_chars: usize,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub top_p: f64,
    pub top_k: u32,
    /// Overrides the provider's public endpoint (proxies, tests).
    #[serde(default)]
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("max_input_chars", &self.max_input_chars)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_provider(LLMProvider::Gemini)
    }
}

impl ClientConfig {
    /// Defaults for a provider, without a credential.
    pub fn for_provider(provider: LLMProvider) -> Self {
        let (model, max_input_chars, top_p) = match provider {
            LLMProvider::Gemini => (DEFAULT_GEMINI_MODEL, GEMINI_MAX_INPUT_CHARS, 0.95),
            LLMProvider::OpenAI => (DEFAULT_OPENAI_MODEL, OPENAI_MAX_INPUT_CHARS, 1.0),
        };
        Self {
            provider,
            api_key: None,
            model: model.into(),
            max_input_chars,
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            top_p,
            top_k: DEFAULT_TOP_K,
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. The credential is read from the
    /// variable belonging to the selected provider only.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("DOCSAGE_PROVIDER") {
            Some(p) if !p.trim().is_empty() => p.parse()?,
            _ => LLMProvider::Gemini,
        };

        let mut config = Self::for_provider(provider);
        config.api_key = lookup(Self::api_key_var(provider)).filter(|k| !k.trim().is_empty());

        if let Some(model) = lookup("DOCSAGE_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        if let Some(chars) = lookup("DOCSAGE_MAX_INPUT_CHARS") {
            config.max_input_chars = parse_var("DOCSAGE_MAX_INPUT_CHARS", &chars)?;
        }
        if let Some(url) = lookup("DOCSAGE_LLM_BASE_URL").filter(|u| !u.trim().is_empty()) {
            config.base_url = Some(url);
        }
        if let Some(secs) = lookup("DOCSAGE_LLM_TIMEOUT_SECS") {
            config.timeout_secs = parse_var("DOCSAGE_LLM_TIMEOUT_SECS", &secs)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Environment variable that carries the provider's credential.
    pub fn api_key_var(provider: LLMProvider) -> &'static str {
        match provider {
            LLMProvider::Gemini => "GEMINI_API_KEY",
            LLMProvider::OpenAI => "OPENAI_API_KEY",
        }
    }

    /// Whether a usable credential is present.
    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// The configured credential, or a configuration error naming the
    /// variable that should carry it.
    pub fn credential(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(Error::Config(format!(
                "{} API key is missing. Please set {} in the environment.",
                self.provider,
                Self::api_key_var(self.provider)
            ))),
        }
    }

    /// Endpoint root for the selected provider.
    pub fn endpoint(&self) -> &str {
        match (&self.base_url, self.provider) {
            (Some(url), _) => url.trim_end_matches('/'),
            (None, LLMProvider::Gemini) => GEMINI_BASE_URL,
            (None, LLMProvider::OpenAI) => OPENAI_BASE_URL,
        }
    }

    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            top_p: self.top_p,
            top_k: self.top_k,
        }
    }

    /// Reject values no backend would accept.
    pub fn validate(&self) -> Result<()> {
        if self.max_input_chars == 0 {
            return Err(Error::Config("max_input_chars must be positive".into()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("model must not be empty".into()));
        }
        if self.max_output_tokens == 0 {
            return Err(Error::Config("max_output_tokens must be positive".into()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {}: '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_provider_defaults() {
        let gemini = ClientConfig::for_provider(LLMProvider::Gemini);
        assert_eq!(gemini.max_input_chars, 30_000);
        assert_eq!(gemini.temperature, 0.3);
        assert_eq!(gemini.max_output_tokens, 4000);
        assert_eq!(gemini.top_p, 0.95);
        assert_eq!(gemini.top_k, 40);

        let openai = ClientConfig::for_provider(LLMProvider::OpenAI);
        assert_eq!(openai.max_input_chars, 32_000);
        assert_eq!(openai.model, "gpt-4o");
        assert_eq!(openai.temperature, 0.3);
    }

    #[test]
    fn test_from_lookup_reads_selected_provider_key() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("DOCSAGE_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-test"),
            ("GEMINI_API_KEY", "g-test"),
        ]))
        .unwrap();
        assert_eq!(config.provider, LLMProvider::OpenAI);
        assert_eq!(config.credential().unwrap(), "sk-test");
    }

    #[test]
    fn test_missing_key_is_not_a_load_error() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.provider, LLMProvider::Gemini);
        assert!(!config.has_credential());

        let err = config.credential().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[("GEMINI_API_KEY", "   ")])).unwrap();
        assert!(!config.has_credential());
    }

    #[test]
    fn test_overrides_and_validation() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("DOCSAGE_MODEL", "gemini-1.5-pro"),
            ("DOCSAGE_MAX_INPUT_CHARS", "1000"),
            ("DOCSAGE_LLM_BASE_URL", "http://localhost:9999/"),
        ]))
        .unwrap();
        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.max_input_chars, 1000);
        assert_eq!(config.endpoint(), "http://localhost:9999");

        let err = ClientConfig::from_lookup(lookup_from(&[("DOCSAGE_MAX_INPUT_CHARS", "0")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ClientConfig::default().with_api_key("super-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
