//! External LLM provider implementations.
//!
//! Each backend makes exactly one non-streaming HTTP call per generation.
//! Gemini receives the system instruction and the user content as two
//! user-role turns; OpenAI receives a system message and a user message.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::backend::GenerationBackend;
use crate::types::{GenerationRequest, LLMProvider, ModelInfo};
use docsage_core::{Error, Result};

// ---------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------

/// Google Generative Language API (`models/{model}:generateContent`).
pub struct GeminiBackend {
    client: Client,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn provider(&self) -> LLMProvider {
        LLMProvider::Gemini
    }

    async fn generate(&self, api_key: &str, request: &GenerationRequest) -> Result<String> {
        let model = request.model.trim_start_matches("models/");
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        debug!("Requesting generation from Gemini with model {}", model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&gemini_request_body(request))
            .send()
            .await
            .map_err(|e| Error::Analysis(format!("Request failed: {}", e)))?;

        let body = read_json(response).await?;
        parse_gemini_response(&body)
    }

    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .query(&[("pageSize", "1000")])
            .header("x-goog-api-key", api_key)
            .send()
            .await
            .map_err(|e| Error::Analysis(format!("Request failed: {}", e)))?;

        let body = read_json(response).await?;
        Ok(parse_gemini_models(&body))
    }
}

pub(crate) fn gemini_request_body(request: &GenerationRequest) -> Value {
    json!({
        "contents": [
            {"role": "user", "parts": [{"text": request.system_instruction}]},
            {"role": "user", "parts": [{"text": request.user_content}]},
        ],
        "generationConfig": {
            "temperature": request.sampling.temperature,
            "maxOutputTokens": request.sampling.max_output_tokens,
            "topP": request.sampling.top_p,
            "topK": request.sampling.top_k,
        },
    })
}

pub(crate) fn parse_gemini_response(body: &Value) -> Result<String> {
    let candidates = body["candidates"].as_array().map(Vec::as_slice).unwrap_or(&[]);

    let Some(candidate) = candidates.first() else {
        return Err(match body["promptFeedback"]["blockReason"].as_str() {
            Some(reason) => Error::Analysis(format!("Prompt was blocked: {}", reason)),
            None => Error::Analysis("Malformed response: no candidates".into()),
        });
    };

    let text: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate["finishReason"].as_str().unwrap_or("unknown");
        return Err(Error::Analysis(format!(
            "Malformed response: candidate has no text (finish reason: {})",
            reason
        )));
    }
    Ok(text)
}

pub(crate) fn parse_gemini_models(body: &Value) -> Vec<ModelInfo> {
    body["models"]
        .as_array()
        .map(|models| {
            models
                .iter()
                .filter_map(|m| {
                    Some(ModelInfo {
                        name: m["name"].as_str()?.to_string(),
                        display_name: m["displayName"].as_str().map(String::from),
                        supported_methods: m["supportedGenerationMethods"]
                            .as_array()
                            .map(|methods| {
                                methods
                                    .iter()
                                    .filter_map(|s| s.as_str().map(String::from))
                                    .collect()
                            })
                            .unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------
// OpenAI
// ---------------------------------------------------------------

/// OpenAI Chat Completions API.
pub struct OpenAIBackend {
    client: Client,
    base_url: String,
}

impl OpenAIBackend {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl GenerationBackend for OpenAIBackend {
    fn provider(&self) -> LLMProvider {
        LLMProvider::OpenAI
    }

    async fn generate(&self, api_key: &str, request: &GenerationRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Requesting completion from {} with model {}", url, request.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&openai_request_body(request))
            .send()
            .await
            .map_err(|e| Error::Analysis(format!("Request failed: {}", e)))?;

        let body = read_json(response).await?;
        parse_openai_response(&body)
    }

    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await
            .map_err(|e| Error::Analysis(format!("Request failed: {}", e)))?;

        let body = read_json(response).await?;
        Ok(parse_openai_models(&body))
    }
}

/// Top-k has no Chat Completions counterpart and is not sent.
pub(crate) fn openai_request_body(request: &GenerationRequest) -> Value {
    json!({
        "model": request.model,
        "messages": [
            {"role": "system", "content": request.system_instruction},
            {"role": "user", "content": request.user_content},
        ],
        "temperature": request.sampling.temperature,
        "max_tokens": request.sampling.max_output_tokens,
        "top_p": request.sampling.top_p,
    })
}

pub(crate) fn parse_openai_response(body: &Value) -> Result<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| Error::Analysis("Malformed response: no message content".into()))
}

pub(crate) fn parse_openai_models(body: &Value) -> Vec<ModelInfo> {
    body["data"]
        .as_array()
        .map(|models| {
            models
                .iter()
                .filter_map(|m| {
                    Some(ModelInfo {
                        name: m["id"].as_str()?.to_string(),
                        display_name: None,
                        supported_methods: Vec::new(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------
// Shared
// ---------------------------------------------------------------

/// Turn a response into JSON, mapping non-success statuses to errors.
async fn read_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| Error::Analysis(format!("Failed to read response: {}", e)))?;

    if !status.is_success() {
        warn!("LLM API returned {}", status);
        return Err(api_error(status, &text));
    }

    serde_json::from_str(&text)
        .map_err(|e| Error::Analysis(format!("Malformed response: {}", e)))
}

/// Both providers wrap failures as `{"error": {"message": ...}}`.
pub(crate) fn api_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Analysis(format!("Authentication failed ({}): {}", status, message))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            Error::Analysis(format!("Rate limited ({}): {}", status, message))
        }
        _ => Error::Analysis(format!("API error {}: {}", status, message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SamplingParams;

    fn request() -> GenerationRequest {
        GenerationRequest {
            model: "test-model".into(),
            system_instruction: "SYSTEM".into(),
            user_content: "USER".into(),
            sampling: SamplingParams {
                temperature: 0.3,
                max_output_tokens: 4000,
                top_p: 0.95,
                top_k: 40,
            },
        }
    }

    #[test]
    fn test_gemini_body_carries_both_turns_and_sampling() {
        let body = gemini_request_body(&request());
        assert_eq!(body["contents"][0]["parts"][0]["text"], "SYSTEM");
        assert_eq!(body["contents"][1]["parts"][0]["text"], "USER");
        assert_eq!(body["contents"][1]["role"], "user");
        assert_eq!(body["generationConfig"]["temperature"], 0.3);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4000);
        assert_eq!(body["generationConfig"]["topP"], 0.95);
        assert_eq!(body["generationConfig"]["topK"], 40);
    }

    #[test]
    fn test_openai_body_uses_system_and_user_messages() {
        let body = openai_request_body(&request());
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "SYSTEM");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "USER");
        assert_eq!(body["max_tokens"], 4000);
        assert!(body.get("top_k").is_none());
    }

    #[test]
    fn test_parse_gemini_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": {"parts": [{"text": "## Summary\n"}, {"text": "Short."}]},
                "finishReason": "STOP",
            }]
        });
        assert_eq!(parse_gemini_response(&body).unwrap(), "## Summary\nShort.");
    }

    #[test]
    fn test_parse_gemini_blocked_prompt() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = parse_gemini_response(&body).unwrap_err();
        assert!(matches!(err, Error::Analysis(_)));
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_parse_gemini_empty_candidate() {
        let body = json!({"candidates": [{"finishReason": "MAX_TOKENS"}]});
        let err = parse_gemini_response(&body).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn test_parse_openai_response() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "Done."}}]});
        assert_eq!(parse_openai_response(&body).unwrap(), "Done.");

        let err = parse_openai_response(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, Error::Analysis(_)));
    }

    #[test]
    fn test_parse_model_lists() {
        let gemini = json!({"models": [{
            "name": "models/gemini-1.5-flash",
            "displayName": "Gemini 1.5 Flash",
            "supportedGenerationMethods": ["generateContent", "countTokens"],
        }]});
        let models = parse_gemini_models(&gemini);
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].display_name.as_deref(), Some("Gemini 1.5 Flash"));
        assert_eq!(models[0].supported_methods, vec!["generateContent", "countTokens"]);

        let openai = json!({"data": [{"id": "gpt-4o"}, {"id": "gpt-4o-mini"}]});
        let names: Vec<String> = parse_openai_models(&openai).into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["gpt-4o", "gpt-4o-mini"]);
    }

    #[test]
    fn test_api_error_classification() {
        let err = api_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "quota exceeded"}}"#,
        );
        assert!(err.to_string().contains("Rate limited"));
        assert!(err.to_string().contains("quota exceeded"));

        let err = api_error(StatusCode::UNAUTHORIZED, "bad key");
        assert!(err.to_string().contains("Authentication failed"));

        let err = api_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, Error::Analysis(_)));
    }
}
