//! Generation client port.
//!
//! The single seam between the orchestration core and whatever language
//! model backend serves an agent step. Adapters exist for Gemini, generic
//! REST endpoints and a scriptable mock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::{AgentDefinition, AgentStep, ProviderType};

/// Request for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Fully resolved prompt text
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    pub model: String,
    pub provider: ProviderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    pub json_output: bool,
    pub disable_thinking: bool,
    /// Calling agent, for logging and analytics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<Uuid>,
}

impl GenerationRequest {
    /// Build a request carrying an agent step's generation parameters.
    pub fn for_step(agent: &AgentDefinition, step: &AgentStep, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_instruction: agent.global_system_instruction.clone(),
            model: step.model.clone(),
            provider: step.provider,
            api_endpoint: step.api_endpoint.clone(),
            api_key: step.api_key.clone(),
            temperature: step.temperature,
            top_k: step.top_k,
            top_p: step.top_p,
            json_output: step.json_output,
            disable_thinking: step.disable_thinking,
            agent_id: Some(agent.id.clone()),
            step_id: Some(step.id.clone()),
            plan_id: None,
        }
    }

    pub fn with_plan(mut self, plan_id: Uuid) -> Self {
        self.plan_id = Some(plan_id);
        self
    }
}

/// Text produced by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResponse {
    pub text: String,
    pub model: String,
}

/// Error types for generation calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Generation timed out after {0}s")]
    Timeout(u64),
}

/// Port trait for language model backends.
///
/// Implementations must be `Send + Sync` for concurrent use across tokio tasks.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Short identifier for logs, e.g. "gemini".
    fn name(&self) -> &str;

    /// Run one generation call.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError>;
}
