//! Agent CLI commands.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::display::{action_success, label, list_table, render_list};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{AgentDefinition, Config};
use crate::domain::ports::AgentRepository;

#[derive(Args, Debug)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommands,
}

#[derive(Subcommand, Debug)]
pub enum AgentCommands {
    /// List agents in the catalogue
    List,
    /// Show agent details
    Show {
        /// Agent name (exact) or id
        name: String,
    },
    /// Import agents from a JSON file holding one definition or an array
    Import {
        file: PathBuf,
    },
    /// Delete an agent
    Delete {
        /// Agent name (exact) or id
        name: String,
        /// Allow deleting a built-in agent
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct AgentOutput {
    pub id: String,
    pub name: String,
    pub description: String,
    pub steps: usize,
    pub is_predefined: bool,
}

impl From<&AgentDefinition> for AgentOutput {
    fn from(agent: &AgentDefinition) -> Self {
        Self {
            id: agent.id.clone(),
            name: agent.name.clone(),
            description: agent.description.clone(),
            steps: agent.steps.len(),
            is_predefined: agent.is_predefined,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AgentListOutput {
    pub agents: Vec<AgentOutput>,
    pub total: usize,
}

impl CommandOutput for AgentListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["name", "steps", "built-in", "description"]);
        for agent in &self.agents {
            table.add_row(vec![
                truncate(&agent.name, 30),
                agent.steps.to_string(),
                if agent.is_predefined { "yes" } else { "" }.to_string(),
                truncate(&agent.description, 60),
            ]);
        }
        render_list("agent", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AgentDetailOutput {
    #[serde(flatten)]
    pub agent: AgentDefinition,
}

impl CommandOutput for AgentDetailOutput {
    fn to_human(&self) -> String {
        let agent = &self.agent;
        let mut lines = vec![
            format!("{} {}", label("Agent:"), agent.name),
            format!("{} {}", label("ID:"), agent.id),
            format!("{} {}", label("Built-in:"), agent.is_predefined),
        ];
        if !agent.description.is_empty() {
            lines.push(format!("{} {}", label("Description:"), agent.description));
        }
        if let Some(purpose) = &agent.documentation_purpose {
            lines.push(format!("{} {purpose}", label("Purpose:")));
        }
        if let Some(system) = &agent.global_system_instruction {
            lines.push(format!("\n{}\n{}", label("System instruction:"), truncate(system, 500)));
        }

        lines.push(format!("\n{} ({}):", label("Steps"), agent.steps.len()));
        for step in &agent.steps {
            lines.push(format!(
                "  - {} [{} / {}]{}",
                step.name,
                step.provider.as_str(),
                step.model,
                if step.json_output { " json" } else { "" }
            ));
            lines.push(format!("    {}", truncate(&step.instruction.replace('\n', " "), 200)));
        }

        if !agent.rag_resources.is_empty() {
            lines.push(format!("\n{}:", label("Resources")));
            for resource in &agent.rag_resources {
                lines.push(format!("  - {} ({})", resource.name, resource.resource_type.as_str()));
            }
        }
        if !agent.tools.is_empty() {
            lines.push(format!("\n{}:", label("Tools")));
            for tool in &agent.tools {
                lines.push(format!("  - {}: {}", tool.name, truncate(&tool.description, 80)));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AgentActionOutput {
    pub success: bool,
    pub message: String,
    pub agents: Vec<AgentOutput>,
}

impl CommandOutput for AgentActionOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

/// Fill in ids missing from an imported definition.
fn with_generated_ids(mut value: Value) -> Value {
    let Some(agent) = value.as_object_mut() else {
        return value;
    };
    let agent_id = match agent.get("id").and_then(Value::as_str) {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => {
            let id = Uuid::new_v4().to_string();
            agent.insert("id".into(), Value::String(id.clone()));
            id
        }
    };
    if let Some(steps) = agent.get_mut("steps").and_then(Value::as_array_mut) {
        for (i, step) in steps.iter_mut().enumerate() {
            if let Some(step) = step.as_object_mut() {
                if step.get("id").and_then(Value::as_str).is_none_or(|id| id.trim().is_empty()) {
                    step.insert("id".into(), Value::String(format!("{agent_id}_step_{}", i + 1)));
                }
            }
        }
    }
    value
}

/// Parse a file holding one agent definition or an array of them.
pub fn parse_import(contents: &str) -> Result<Vec<AgentDefinition>> {
    let value: Value = serde_json::from_str(contents).context("Agent file is not valid JSON")?;
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    items
        .into_iter()
        .map(|item| {
            let mut agent: AgentDefinition =
                serde_json::from_value(with_generated_ids(item)).context("Invalid agent definition")?;
            agent.is_predefined = false;
            Ok(agent)
        })
        .collect()
}

async fn find_agent(repo: &impl AgentRepository, name_or_id: &str) -> Result<AgentDefinition> {
    if let Some(agent) = repo.get_by_name(name_or_id).await? {
        return Ok(agent);
    }
    repo.get(name_or_id)
        .await?
        .with_context(|| format!("Agent not found: {name_or_id}"))
}

pub async fn execute(args: AgentArgs, config: Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let repo = ctx.agents.as_ref();

    match args.command {
        AgentCommands::List => {
            let agents = repo.list().await?;
            let out = AgentListOutput {
                total: agents.len(),
                agents: agents.iter().map(AgentOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        AgentCommands::Show { name } => {
            let mut agent = find_agent(repo, &name).await?;
            for step in &mut agent.steps {
                if step.api_key.is_some() {
                    step.api_key = Some("********".to_string());
                }
            }
            output(&AgentDetailOutput { agent }, json_mode);
        }

        AgentCommands::Import { file } => {
            let contents = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let agents = parse_import(&contents)?;
            for agent in &agents {
                repo.upsert(agent)
                    .await
                    .with_context(|| format!("Failed to import agent '{}'", agent.name))?;
            }

            let out = AgentActionOutput {
                success: true,
                message: format!("Imported {} agent(s) from {}", agents.len(), file.display()),
                agents: agents.iter().map(AgentOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        AgentCommands::Delete { name, force } => {
            let agent = find_agent(repo, &name).await?;
            if agent.is_predefined && !force {
                bail!("'{}' is a built-in agent; pass --force to delete it", agent.name);
            }
            repo.delete(&agent.id).await?;

            let out = AgentActionOutput {
                success: true,
                message: format!("Agent deleted: {}", agent.name),
                agents: vec![AgentOutput::from(&agent)],
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import_single_and_array() {
        let single = r#"{"name": "Summarizer", "steps": [{"name": "Summarize", "instruction": "Summarize {{input}}"}]}"#;
        let agents = parse_import(single).unwrap();
        assert_eq!(agents.len(), 1);
        assert!(!agents[0].id.is_empty());
        assert_eq!(agents[0].steps[0].id, format!("{}_step_1", agents[0].id));
        assert_eq!(agents[0].steps[0].model, "gemini-2.5-flash");

        let array = r#"[{"id": "a", "name": "A", "is_predefined": true}, {"id": "b", "name": "B"}]"#;
        let agents = parse_import(array).unwrap();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].id, "a");
        assert!(!agents[0].is_predefined, "imports are never built-in");
    }

    #[test]
    fn test_parse_import_rejects_garbage() {
        assert!(parse_import("not json").is_err());
        assert!(parse_import(r#"{"id": "x"}"#).is_err());
    }
}
