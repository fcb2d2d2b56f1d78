//! Planner service: everything that talks to the Maestro agent.
//!
//! Three modes share one Maestro step: drafting a plan from a goal, chatting
//! (including agent design), and free-form advanced prompts. Only drafting
//! produces plan records.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AgentDefinition, OrchestrationPlan, PlannerConfig, TaskExecutionRecord};
use crate::domain::ports::{AgentRepository, GenerationClient, GenerationRequest, PlanRepository, TaskRecorder};
use crate::services::agent_summary::build_agent_summary;
use crate::services::builtin_agents::{MAESTRO_AGENTS_PLACEHOLDER, MAESTRO_INPUT_PLACEHOLDER};
use crate::services::plan_parser::{parse_plan, PlanParseOutcome};
use crate::services::template;

const MAESTRO_ACTION: &str = "process user request";

/// Result of asking the Maestro agent for a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftOutcome {
    /// Parsed plan, saved and pending approval
    Plan(OrchestrationPlan),
    /// Plan-like output that could not be parsed, saved as failed
    Malformed(OrchestrationPlan),
    /// The Maestro answered conversationally; nothing was saved
    Conversational { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Maestro,
}

impl ChatRole {
    fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Maestro => "Maestro",
        }
    }
}

/// One message of a chat with the Maestro agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn maestro(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Maestro, content: content.into() }
    }
}

/// The Maestro agent's chat answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub text: String,
    /// The reply contains a structured new agent design
    pub is_agent_design: bool,
}

/// Whether a reply looks like a structured new agent design.
pub fn is_agent_design(text: &str) -> bool {
    text.contains("### New Agent Design")
        || (text.contains("**Agent Name:**")
            && text.contains("**Steps:**")
            && (text.contains("**Instruction:**") || text.contains("**Prompt:**")))
}

fn mentions_agent_design(goal: &str) -> bool {
    let lower = goal.to_lowercase();
    (lower.contains("design") || lower.contains("create") || lower.contains("build")) && lower.contains("agent")
}

pub struct PlannerService<A: AgentRepository, P: PlanRepository> {
    agents: Arc<A>,
    plans: Arc<P>,
    client: Arc<dyn GenerationClient>,
    recorder: Arc<dyn TaskRecorder>,
    config: PlannerConfig,
}

impl<A: AgentRepository, P: PlanRepository> PlannerService<A, P> {
    pub fn new(
        agents: Arc<A>,
        plans: Arc<P>,
        client: Arc<dyn GenerationClient>,
        recorder: Arc<dyn TaskRecorder>,
    ) -> Self {
        Self {
            agents,
            plans,
            client,
            recorder,
            config: PlannerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    async fn maestro(&self) -> DomainResult<AgentDefinition> {
        self.agents
            .get(&self.config.maestro_agent_id)
            .await?
            .ok_or_else(|| DomainError::AgentNotFound(self.config.maestro_agent_id.clone()))
    }

    async fn workers(&self) -> DomainResult<Vec<AgentDefinition>> {
        let agents = self.agents.list().await?;
        Ok(agents
            .into_iter()
            .filter(|a| a.id != self.config.maestro_agent_id)
            .collect())
    }

    /// Run the Maestro step with the given input and agent summary.
    async fn call_maestro(&self, input: &str, agent_summary: &str) -> DomainResult<String> {
        let maestro = self.maestro().await?;
        let step = maestro.resolve_step(MAESTRO_ACTION)?;

        let values = HashMap::from([
            (MAESTRO_INPUT_PLACEHOLDER.to_string(), input.to_string()),
            (MAESTRO_AGENTS_PLACEHOLDER.to_string(), agent_summary.to_string()),
        ]);
        let prompt = template::resolve(&step.instruction, &values);
        let record = TaskExecutionRecord::start(&maestro.id, &maestro.name, &step.id, &step.name, input, &prompt);
        let request = GenerationRequest::for_step(&maestro, step, prompt);

        tracing::debug!(agent = %maestro.name, client = self.client.name(), "Calling Maestro agent");
        match self.client.generate(request).await {
            Ok(response) if !response.text.trim().is_empty() => {
                self.recorder.record_best_effort(&record.complete(&response.text)).await;
                Ok(response.text)
            }
            Ok(_) => {
                let error = "The Maestro agent returned an empty response".to_string();
                self.recorder.record_best_effort(&record.fail(&error)).await;
                Err(DomainError::GenerationFailed(error))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Maestro agent call failed");
                self.recorder.record_best_effort(&record.fail(e.to_string())).await;
                Err(DomainError::GenerationFailed(e.to_string()))
            }
        }
    }

    /// Ask the Maestro agent to plan a goal.
    pub async fn draft_plan(&self, goal: &str) -> DomainResult<DraftOutcome> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(DomainError::ValidationFailed("Goal cannot be empty".into()));
        }

        let workers = self.workers().await?;
        if workers.is_empty() && !mentions_agent_design(goal) {
            tracing::warn!("No worker agents defined; the plan can only report capability gaps");
        }

        let input = format!("User Goal (for Orchestration Plan):\n{goal}");
        let raw = self.call_maestro(&input, &build_agent_summary(&workers)).await?;

        match parse_plan(&raw, goal) {
            PlanParseOutcome::Parsed(plan) => {
                self.plans.save(&plan).await?;
                tracing::info!(plan_id = %plan.id, steps = plan.steps.len(), "Drafted orchestration plan");
                Ok(DraftOutcome::Plan(plan))
            }
            PlanParseOutcome::Malformed(plan) => {
                self.plans.save(&plan).await?;
                tracing::warn!(plan_id = %plan.id, "Maestro output could not be parsed into steps");
                Ok(DraftOutcome::Malformed(plan))
            }
            PlanParseOutcome::Conversational => {
                tracing::info!("Maestro answered conversationally; no plan created");
                Ok(DraftOutcome::Conversational { text: raw })
            }
        }
    }

    /// Chat with the Maestro agent, forwarding the most recent turns.
    pub async fn chat(&self, history: &[ChatTurn], message: &str) -> DomainResult<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(DomainError::ValidationFailed("Message cannot be empty".into()));
        }

        let skip = history.len().saturating_sub(self.config.chat_history_turns);
        let mut context: Vec<String> = history[skip..]
            .iter()
            .map(|t| format!("{}: {}", t.role.label(), t.content))
            .collect();
        context.push(format!("User: {message}"));

        let summary = if message.to_lowercase().contains("agent") {
            build_agent_summary(&self.workers().await?)
        } else {
            "[]".to_string()
        };
        let input = format!(
            "User Chat Message (respond conversationally, assist with agent design if asked, or provide info):\n{}",
            context.join("\n")
        );

        let text = self.call_maestro(&input, &summary).await?;
        let is_agent_design = is_agent_design(&text);
        Ok(ChatReply { text, is_agent_design })
    }

    /// Send a free-form prompt to the Maestro agent.
    pub async fn advanced_prompt(&self, prompt: &str) -> DomainResult<String> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(DomainError::ValidationFailed("Prompt cannot be empty".into()));
        }
        let summary = build_agent_summary(&self.workers().await?);
        self.call_maestro(&format!("Advanced User Prompt:\n{prompt}"), &summary).await
    }
}
