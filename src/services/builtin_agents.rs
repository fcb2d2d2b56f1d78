//! Built-in agent catalogue.
//!
//! Seeded into the agent store by `maestro init`: four content worker agents
//! and the Maestro planner that orchestrates them.

use crate::domain::errors::DomainResult;
use crate::domain::models::{AgentDefinition, AgentStep, MAESTRO_AGENT_ID};
use crate::domain::ports::AgentRepository;

/// Placeholder the planner fills with the goal, chat input or raw prompt.
pub const MAESTRO_INPUT_PLACEHOLDER: &str = "user_goal_or_chat_input_or_advanced_prompt";

/// Placeholder the planner fills with the worker agent summary.
pub const MAESTRO_AGENTS_PLACEHOLDER: &str = "available_agents_json_summary";

const MAESTRO_SYSTEM_INSTRUCTION: &str = r####"You are the "Maestro Orchestrator". You can:
1. Orchestrate execution plans. Given a user goal and a JSON summary of the available worker agents, break the goal into sequential steps and assign each to one worker agent step.
   Output the plan in EXACTLY this Markdown format:
   ## Maestro Orchestration Plan
   **User Goal:** <the goal>
   ---
   **Plan Step 1: <short task name>**
   *   **Task Description:** <what this step achieves>
   *   **Assigned Agent:** `<exact worker agent name>`
   *   **Assigned Agent Step:** `<exact step name within that agent>`
   *   **Input:** <what the step needs; write "Output from Plan Step X: ..." for data from an earlier step and "User-provided: ..." for data the user must supply>
   *   **Output:** <what the step produces>
   ---
   (repeat for every step, separated by "---")
   Only use agents and steps that appear in the summary. If no agent can perform a crucial task, emit a step with:
   *   **Task Description:** CRITICAL GAP: NEW AGENT/STEP REQUIRED - <missing capability>
   *   **Assigned Agent:** `N/A (New Capability Needed)`
   *   **Assigned Agent Step:** `N/A`
2. Design new agents. When asked in conversation, answer with "### New Agent Design" followed by **Agent Name:**, **Description:**, **Global System Instruction:**, **Documentation:** and **Steps:** (each with **Instruction:**, **Model:** and config notes).
3. Converse. Answer questions about orchestration, the available agents and agent design."####;

const MAESTRO_STEP_INSTRUCTION: &str = "User Goal/Request:\n{{user_goal_or_chat_input_or_advanced_prompt}}\n\n\
Available Worker Agents (JSON summary):\n{{available_agents_json_summary}}\n---\n\
Process the request according to your system instruction. \
For an orchestration request, answer with a plan in the strict Markdown format. \
For a chat message or an agent design request, answer conversationally and use the structured agent design format when designing. \
For an advanced prompt, answer it directly.";

/// The Maestro planner agent.
pub fn maestro_agent() -> AgentDefinition {
    AgentDefinition::new(
        "Maestro Orchestrator Agent",
        "Analyzes user goals, drafts orchestration plans across worker agents and helps design new agents.",
    )
    .with_id(MAESTRO_AGENT_ID)
    .with_system_instruction(MAESTRO_SYSTEM_INSTRUCTION)
    .with_purpose("High-level planner: turns a goal into a step-by-step plan over the worker agent catalogue.")
    .with_step(
        AgentStep::new("Process User Request (Plan, Chat, or Design)", MAESTRO_STEP_INSTRUCTION)
            .with_id(format!("{MAESTRO_AGENT_ID}_step_1")),
    )
    .predefined()
}

/// All built-in agents, workers first.
pub fn builtin_agents() -> Vec<AgentDefinition> {
    vec![
        AgentDefinition::new("Keyword Researcher Agent", "Generates a list of SEO keywords for a topic.")
            .with_id("predef_keyword_researcher")
            .with_system_instruction("You are an expert SEO keyword analyst.")
            .with_purpose("Produce relevant SEO keywords for a topic to guide content strategy.")
            .with_step(
                AgentStep::new(
                    "Generate Keywords",
                    "Generate 10-15 relevant SEO keywords for the topic: \"{{topic}}\".\n\
                     Return them as one comma-separated list without numbering or bullets.",
                )
                .with_id("predef_keyword_researcher_step_1"),
            )
            .predefined(),
        AgentDefinition::new("Content Planner Agent", "Creates a structured content outline for a topic.")
            .with_id("predef_content_planner")
            .with_system_instruction("You are a strategic content planner who writes well-structured outlines.")
            .with_purpose("Outline a blog post: title, introduction, main sections with sub-points, conclusion.")
            .with_step(
                AgentStep::new(
                    "Generate Content Outline",
                    "Create a blog post outline for the topic: \"{{topic}}\".\n\
                     Include a title, a one or two sentence introduction, 3-5 main sections with 2-3 sub-points each, \
                     and a short conclusion.",
                )
                .with_id("predef_content_planner_step_1"),
            )
            .predefined(),
        AgentDefinition::new(
            "Content Writer Agent",
            "Drafts a piece of content for a given topic, content type and length.",
        )
        .with_id("predef_content_writer")
        .with_system_instruction("You are a versatile content writer who adapts tone to the requested format.")
        .with_purpose("Write content such as an introduction or a blog section from a topic, type and length.")
        .with_step(
            AgentStep::new(
                "Write Content Piece",
                "Write {{contentType}} about \"{{topic}}\".\nThe content should be {{length}}.\n\
                 Keep the tone informative and engaging.",
            )
            .with_id("predef_content_writer_step_1"),
        )
        .predefined(),
        AgentDefinition::new(
            "Meta Tag Generator Agent",
            "Generates SEO meta titles and descriptions as JSON.",
        )
        .with_id("predef_meta_tag_generator")
        .with_system_instruction("You are an SEO specialist who writes compelling meta tags.")
        .with_purpose("Produce a meta title under 60 characters and a meta description under 160 characters.")
        .with_step(
            AgentStep::new(
                "Generate Meta Tags (JSON)",
                "Write an SEO meta title (under 60 characters) and meta description (under 160 characters) \
                 for a page with this content summary:\n\"{{contentSummary}}\"\n\n\
                 Respond only with a JSON object with the keys \"title\" and \"description\".",
            )
            .with_id("predef_meta_tag_generator_step_1")
            .with_json_output(),
        )
        .predefined(),
        maestro_agent(),
    ]
}

/// Insert built-in agents that are missing from the store.
///
/// Existing agents with a built-in id are left alone so user edits survive.
/// Returns the number of agents inserted.
pub async fn seed_builtin_agents<R: AgentRepository + ?Sized>(repository: &R) -> DomainResult<usize> {
    let mut inserted = 0;
    for agent in builtin_agents() {
        if repository.get(&agent.id).await?.is_none() {
            repository.upsert(&agent).await?;
            inserted += 1;
        }
    }
    tracing::info!(inserted, "Seeded built-in agents");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryAgentRepository;
    use crate::services::template::placeholders;

    #[test]
    fn test_builtin_agents_are_valid() {
        let agents = builtin_agents();
        assert_eq!(agents.len(), 5);
        for agent in &agents {
            agent.validate().unwrap();
            assert!(agent.is_predefined);
        }
        assert_eq!(agents.iter().filter(|a| a.is_maestro()).count(), 1);
    }

    #[test]
    fn test_maestro_step_has_planner_placeholders() {
        let maestro = maestro_agent();
        let names = placeholders(&maestro.steps[0].instruction);
        assert_eq!(names, vec![MAESTRO_INPUT_PLACEHOLDER, MAESTRO_AGENTS_PLACEHOLDER]);
        assert!(maestro
            .global_system_instruction
            .as_deref()
            .is_some_and(|s| s.contains("N/A (New Capability Needed)")));
    }

    #[test]
    fn test_maestro_system_instruction_is_complete() {
        let instruction = maestro_agent().global_system_instruction.unwrap_or_default();
        assert!(instruction.contains("### New Agent Design"));
        assert!(instruction.contains("## Maestro Orchestration Plan"));
        assert!(instruction.ends_with("the available agents and agent design."));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent_and_keeps_edits() {
        let repo = InMemoryAgentRepository::new();
        assert_eq!(seed_builtin_agents(&repo).await.unwrap(), 5);

        let mut edited = repo.get("predef_content_writer").await.unwrap().unwrap();
        edited.description = "Custom".into();
        repo.upsert(&edited).await.unwrap();

        assert_eq!(seed_builtin_agents(&repo).await.unwrap(), 0);
        let kept = repo.get("predef_content_writer").await.unwrap().unwrap();
        assert_eq!(kept.description, "Custom");
    }
}
