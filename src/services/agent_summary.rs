//! Compact JSON description of the worker agent catalogue.
//!
//! The planner prompt embeds this summary so the model can assign plan steps
//! to agents and step names that actually exist.

use serde::Serialize;

use crate::domain::models::{summarize, AgentDefinition};

const INSTRUCTION_SUMMARY_CHARS: usize = 100;
const RESOURCE_DESCRIPTION_CHARS: usize = 50;

#[derive(Serialize)]
struct AgentSummary<'a> {
    name: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    documentation_purpose: Option<&'a str>,
    steps: Vec<StepSummary<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rag_resources: Vec<ResourceSummary<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSummary<'a>>,
}

#[derive(Serialize)]
struct StepSummary<'a> {
    name: &'a str,
    instruction_summary: String,
    provider: &'static str,
    model: &'a str,
}

#[derive(Serialize)]
struct ResourceSummary<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    resource_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Serialize)]
struct ToolSummary<'a> {
    name: &'a str,
    description: String,
}

fn summarize_agent(agent: &AgentDefinition) -> AgentSummary<'_> {
    AgentSummary {
        name: &agent.name,
        description: &agent.description,
        documentation_purpose: agent.documentation_purpose.as_deref(),
        steps: agent
            .steps
            .iter()
            .map(|s| StepSummary {
                name: &s.name,
                instruction_summary: summarize(&s.instruction, INSTRUCTION_SUMMARY_CHARS),
                provider: s.provider.as_str(),
                model: &s.model,
            })
            .collect(),
        rag_resources: agent
            .rag_resources
            .iter()
            .map(|r| ResourceSummary {
                name: &r.name,
                resource_type: r.resource_type.as_str(),
                description: r.description.as_deref().map(|d| summarize(d, RESOURCE_DESCRIPTION_CHARS)),
            })
            .collect(),
        tools: agent
            .tools
            .iter()
            .map(|t| ToolSummary {
                name: &t.name,
                description: summarize(&t.description, RESOURCE_DESCRIPTION_CHARS),
            })
            .collect(),
    }
}

/// Serialize the agents into the compact planner summary.
///
/// Yields `"[]"` if serialization fails.
pub fn build_agent_summary(agents: &[AgentDefinition]) -> String {
    let summaries: Vec<_> = agents.iter().map(summarize_agent).collect();
    serde_json::to_string(&summaries).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to serialize agent summary");
        "[]".to_string()
    })
}
