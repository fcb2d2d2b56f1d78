//! Agent domain model.
//!
//! An agent is a named bundle of prompt templates ("steps") plus the
//! generation parameters used to invoke a language model with each of them.
//! Worker agents execute plan steps; the Maestro agent drafts the plans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Identifier of the built-in planner agent.
pub const MAESTRO_AGENT_ID: &str = "predef_maestro_orchestrator";

/// Model used when a step does not name one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Which generation backend serves a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// Google Gemini `generateContent` REST API
    GoogleGemini,
    /// Any JSON-over-HTTP endpoint accepting a prompt
    GenericRest,
}

impl Default for ProviderType {
    fn default() -> Self {
        Self::GoogleGemini
    }
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoogleGemini => "google_gemini",
            Self::GenericRest => "generic_rest",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "google_gemini" | "gemini" => Some(Self::GoogleGemini),
            "generic_rest" | "rest" => Some(Self::GenericRest),
            _ => None,
        }
    }
}

/// Kind of retrieval resource attached to an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RagResourceType {
    TextContent,
    WebUrl,
}

impl RagResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextContent => "text_content",
            Self::WebUrl => "web_url",
        }
    }
}

/// Reference material an agent may draw on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagResource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: RagResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// External tool an agent is documented to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTool {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// One prompt template of an agent plus its generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    pub id: String,
    /// Matched against a plan step's assigned step name
    pub name: String,
    /// Prompt template with `{{placeholder}}` markers
    pub instruction: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub provider: ProviderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Ask the backend for a JSON response body
    #[serde(default)]
    pub json_output: bool,
    #[serde(default)]
    pub disable_thinking: bool,
}

impl AgentStep {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            instruction: instruction.into(),
            model: default_model(),
            provider: ProviderType::default(),
            api_endpoint: None,
            api_key: None,
            temperature: None,
            top_k: None,
            top_p: None,
            json_output: false,
            disable_thinking: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    /// Route this step to a generic REST endpoint.
    pub fn with_rest_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.provider = ProviderType::GenericRest;
        self.api_endpoint = Some(endpoint.into());
        self
    }
}

/// A named catalogue entry: description, steps and documentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// System instruction applied to every step of this agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_system_instruction: Option<String>,
    #[serde(default)]
    pub steps: Vec<AgentStep>,
    #[serde(default)]
    pub is_predefined: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_purpose: Option<String>,
    #[serde(default)]
    pub rag_resources: Vec<RagResource>,
    #[serde(default)]
    pub tools: Vec<AgentTool>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl AgentDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            global_system_instruction: None,
            steps: Vec::new(),
            is_predefined: false,
            documentation_purpose: None,
            rag_resources: Vec::new(),
            tools: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_step(mut self, step: AgentStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.global_system_instruction = Some(instruction.into());
        self
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.documentation_purpose = Some(purpose.into());
        self
    }

    pub fn predefined(mut self) -> Self {
        self.is_predefined = true;
        self
    }

    pub fn is_maestro(&self) -> bool {
        self.id == MAESTRO_AGENT_ID
    }

    /// Exact, case-sensitive lookup of a step by name.
    pub fn step_by_name(&self, name: &str) -> Option<&AgentStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Pick the step that serves a loosely named action.
    ///
    /// Returns the first step whose name contains `action` (case-insensitive),
    /// falling back to the first step. Fails only when the agent has no steps.
    pub fn resolve_step(&self, action: &str) -> DomainResult<&AgentStep> {
        let needle = action.trim().to_lowercase();
        if !needle.is_empty() {
            if let Some(step) = self.steps.iter().find(|s| s.name.to_lowercase().contains(&needle)) {
                return Ok(step);
            }
        }
        self.steps.first().ok_or_else(|| {
            DomainError::ValidationFailed(format!("Agent '{}' has no steps", self.name))
        })
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.id.trim().is_empty() {
            return Err(DomainError::ValidationFailed("Agent id cannot be empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationFailed("Agent name cannot be empty".into()));
        }
        for step in &self.steps {
            if step.name.trim().is_empty() {
                return Err(DomainError::ValidationFailed(format!(
                    "Agent '{}' has a step with an empty name",
                    self.name
                )));
            }
            if step.provider == ProviderType::GenericRest && step.api_endpoint.is_none() {
                return Err(DomainError::ValidationFailed(format!(
                    "Step '{}' of agent '{}' uses the generic REST provider without an endpoint",
                    step.name, self.name
                )));
            }
            if let Some(t) = step.temperature {
                if !(0.0..=2.0).contains(&t) {
                    return Err(DomainError::ValidationFailed(format!(
                        "Step '{}' temperature must be between 0 and 2",
                        step.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> AgentDefinition {
        AgentDefinition::new("Writer", "Writes things")
            .with_step(AgentStep::new("Draft Article", "Write about {{topic}}"))
            .with_step(AgentStep::new("Polish Draft", "Polish {{input}}"))
    }

    #[test]
    fn test_step_by_name_is_case_sensitive() {
        let agent = writer();
        assert!(agent.step_by_name("Draft Article").is_some());
        assert!(agent.step_by_name("draft article").is_none());
    }

    #[test]
    fn test_resolve_step_matches_substring() {
        let agent = writer();
        assert_eq!(agent.resolve_step("polish").unwrap().name, "Polish Draft");
    }

    #[test]
    fn test_resolve_step_falls_back_to_first() {
        let agent = writer();
        assert_eq!(agent.resolve_step("translate").unwrap().name, "Draft Article");
        assert_eq!(agent.resolve_step("").unwrap().name, "Draft Article");
    }

    #[test]
    fn test_resolve_step_without_steps_fails() {
        let agent = AgentDefinition::new("Empty", "");
        assert!(agent.resolve_step("anything").is_err());
    }

    #[test]
    fn test_validate_rejects_rest_without_endpoint() {
        let mut step = AgentStep::new("Call", "x");
        step.provider = ProviderType::GenericRest;
        let agent = AgentDefinition::new("Rest", "").with_step(step);
        assert!(agent.validate().is_err());

        let ok = AgentDefinition::new("Rest", "")
            .with_step(AgentStep::new("Call", "x").with_rest_endpoint("http://localhost/gen"));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let json = r#"{"id":"a1","name":"Tiny","steps":[{"id":"s1","name":"Only","instruction":"hi"}]}"#;
        let agent: AgentDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(agent.steps[0].model, DEFAULT_MODEL);
        assert_eq!(agent.steps[0].provider, ProviderType::GoogleGemini);
        assert!(!agent.is_predefined);
    }

    #[test]
    fn test_provider_type_roundtrip_str() {
        for p in [ProviderType::GoogleGemini, ProviderType::GenericRest] {
            assert_eq!(ProviderType::from_str(p.as_str()), Some(p));
        }
        assert_eq!(ProviderType::from_str("Gemini"), Some(ProviderType::GoogleGemini));
    }
}
