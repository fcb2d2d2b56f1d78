//! Google Gemini generation adapter.
//!
//! Calls the `generateContent` endpoint of the Generative Language API. The
//! API key comes from the agent step, then from configuration, then from the
//! `GEMINI_API_KEY` environment variable.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::domain::models::GeminiProviderConfig;
use crate::domain::ports::{GenerationClient, GenerationError, GenerationRequest, GenerationResponse};
use crate::infrastructure::logging::scrub_secrets;

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration for the Gemini client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key (optional, falls back to `GEMINI_API_KEY`)
    pub api_key: Option<String>,

    /// Base URL for the API (for testing/proxies)
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self::from(&GeminiProviderConfig::default())
    }
}

impl From<&GeminiProviderConfig> for GeminiConfig {
    fn from(config: &GeminiProviderConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        }
    }
}

impl GeminiConfig {
    /// Configured key, or the environment variable.
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(GEMINI_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn build_body(request: &GenerationRequest) -> GenerateContentRequest<'_> {
    let generation_config = GenerationConfig {
        temperature: request.temperature,
        top_k: request.top_k,
        top_p: request.top_p,
        response_mime_type: request.json_output.then_some("application/json"),
        thinking_config: request
            .disable_thinking
            .then_some(ThinkingConfig { thinking_budget: 0 }),
    };
    let has_config = generation_config.temperature.is_some()
        || generation_config.top_k.is_some()
        || generation_config.top_p.is_some()
        || generation_config.response_mime_type.is_some()
        || generation_config.thinking_config.is_some();

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part { text: &request.prompt }],
        }],
        system_instruction: request
            .system_instruction
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
        generation_config: has_config.then_some(generation_config),
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<(String, Option<String>), GenerationError> {
    let model_version = response.model_version;
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(GenerationError::InvalidResponse(format!("Response blocked: {reason}")));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".to_string());
        return Err(GenerationError::InvalidResponse(format!(
            "Empty response (finish reason: {reason})"
        )));
    }
    Ok((text, model_version))
}

fn classify_error(status: StatusCode, body: &str) -> GenerationError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map_or_else(|_| body.trim().to_string(), |e| e.error.message);
    let message = scrub_secrets(&message);

    let invalid_key = status == StatusCode::BAD_REQUEST && message.contains("API key");
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN || invalid_key {
        GenerationError::AuthError(message)
    } else {
        GenerationError::ApiError {
            status: status.as_u16(),
            message,
        }
    }
}

/// Gemini generation client
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.config.base_url)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, request), fields(model = %request.model, step_id = ?request.step_id))]
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let api_key = request
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.config.get_api_key())
            .ok_or_else(|| {
                GenerationError::NotConfigured(format!(
                    "Gemini API key missing; set providers.gemini.api_key or {GEMINI_API_KEY_ENV}"
                ))
            })?;

        let body = build_body(&request);
        debug!(prompt_chars = request.prompt.chars().count(), "sending Gemini request");

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.config.timeout_secs)
                } else {
                    GenerationError::NetworkError(scrub_secrets(&e.to_string()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            let error = classify_error(status, &body);
            warn!(status = status.as_u16(), error = %error, "Gemini request failed");
            return Err(error);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(format!("Failed to parse Gemini response: {e}")))?;

        let (text, model_version) = extract_text(parsed)?;
        Ok(GenerationResponse {
            text,
            model: model_version.unwrap_or(request.model),
        })
    }
}
