//! Worker agent dispatch.
//!
//! Resolves a plan step's assignment against the agent catalogue and invokes
//! the assigned worker step through the generation client. Every problem is
//! folded into a [`StepOutcome`]; dispatch itself never fails.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::models::{
    is_capability_gap, summarize, AgentDefinition, AgentStep, OrchestrationPlan, StepOutcome, StepStatus,
    TaskExecutionRecord,
};
use crate::domain::ports::{GenerationClient, GenerationError, GenerationRequest, TaskRecorder};
use crate::services::template;

pub const CAPABILITY_GAP_ERROR: &str = "Identified as a gap requiring new agent/step.";
pub const CAPABILITY_GAP_RESULT: &str = "Step skipped - requires new agent/capability.";

/// How a plan step's assignment maps onto the catalogue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    Resolved {
        agent: &'a AgentDefinition,
        step: &'a AgentStep,
    },
    CapabilityGap,
    AgentNotFound,
    StepNotFound,
}

/// Exact, case-sensitive lookup of an agent by name and then a step by name.
pub fn resolve<'a>(agent_name: &str, step_name: &str, agents: &'a [AgentDefinition]) -> Resolution<'a> {
    if is_capability_gap(agent_name) {
        return Resolution::CapabilityGap;
    }
    let Some(agent) = agents.iter().find(|a| a.name == agent_name) else {
        return Resolution::AgentNotFound;
    };
    match agent.step_by_name(step_name) {
        Some(step) => Resolution::Resolved { agent, step },
        None => Resolution::StepNotFound,
    }
}

/// Values available to worker step templates.
pub fn step_values(plan: &OrchestrationPlan, index: usize) -> HashMap<String, String> {
    let step = &plan.steps[index];
    let mut values = HashMap::from([
        ("user_goal".to_string(), plan.user_goal.clone()),
        ("task_name".to_string(), step.task_name.clone()),
        ("task_description".to_string(), step.task_description.clone()),
        ("input".to_string(), step.input_summary.clone()),
        ("expected_output".to_string(), step.output_summary.clone()),
    ]);
    if let Some(previous) = plan.previous_output(index) {
        values.insert("previous_output".to_string(), previous.to_string());
    }
    values
}

/// Resolved instruction followed by the plan context block.
pub fn build_worker_prompt(agent_step: &AgentStep, plan: &OrchestrationPlan, index: usize) -> String {
    let values = step_values(plan, index);
    let missing = template::unresolved(&agent_step.instruction, &values);
    if !missing.is_empty() {
        tracing::debug!(step = %agent_step.name, ?missing, "Worker instruction has placeholders without values");
    }

    let step = &plan.steps[index];
    let mut prompt = template::resolve(&agent_step.instruction, &values);
    prompt.push_str("\n\n---\nPlan context\n");
    let _ = writeln!(prompt, "User goal: {}", plan.user_goal);
    let _ = writeln!(prompt, "Current task (Plan Step {}): {}", step.serial_number, step.task_name);
    if !step.task_description.is_empty() {
        let _ = writeln!(prompt, "Task description: {}", step.task_description);
    }
    if !step.input_summary.is_empty() {
        let _ = writeln!(prompt, "Input: {}", step.input_summary);
    }
    if !step.output_summary.is_empty() {
        let _ = writeln!(prompt, "Expected output: {}", step.output_summary);
    }

    let earlier: Vec<_> = plan.steps[..index]
        .iter()
        .filter(|s| s.status == StepStatus::Completed)
        .filter_map(|s| s.result.as_deref().map(|r| (s, r)))
        .collect();
    if !earlier.is_empty() {
        prompt.push_str("\nResults from earlier steps:\n");
        for (s, result) in earlier {
            let _ = writeln!(prompt, "[Plan Step {}: {}]\n{}", s.serial_number, s.task_name, result);
        }
    }
    prompt
}

/// Invokes worker agent steps for plan steps.
#[derive(Clone)]
pub struct WorkerDispatcher {
    client: Arc<dyn GenerationClient>,
    recorder: Arc<dyn TaskRecorder>,
    step_timeout: Option<Duration>,
    result_max_chars: usize,
}

impl WorkerDispatcher {
    pub fn new(client: Arc<dyn GenerationClient>, recorder: Arc<dyn TaskRecorder>) -> Self {
        Self {
            client,
            recorder,
            step_timeout: None,
            result_max_chars: 4000,
        }
    }

    /// Bound each generation call; zero disables the bound.
    pub fn with_step_timeout_secs(mut self, secs: u64) -> Self {
        self.step_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    pub fn with_result_max_chars(mut self, max: usize) -> Self {
        self.result_max_chars = max;
        self
    }

    /// Resolve and run the plan step at `index`.
    pub async fn dispatch(&self, plan: &OrchestrationPlan, index: usize, agents: &[AgentDefinition]) -> StepOutcome {
        let step = &plan.steps[index];
        match resolve(&step.assigned_agent_name, &step.assigned_agent_step_name, agents) {
            Resolution::CapabilityGap => {
                tracing::info!(plan_id = %plan.id, step = step.serial_number, "Skipping capability gap step");
                StepOutcome::Skipped {
                    error: CAPABILITY_GAP_ERROR.to_string(),
                    result: CAPABILITY_GAP_RESULT.to_string(),
                }
            }
            Resolution::AgentNotFound => {
                tracing::warn!(plan_id = %plan.id, agent = %step.assigned_agent_name, "Assigned agent not found");
                StepOutcome::Failed {
                    error: format!("Configuration error: agent '{}' not found.", step.assigned_agent_name),
                    result: None,
                    task_record_id: None,
                }
            }
            Resolution::StepNotFound => {
                tracing::warn!(
                    plan_id = %plan.id,
                    agent = %step.assigned_agent_name,
                    step = %step.assigned_agent_step_name,
                    "Assigned agent step not found"
                );
                StepOutcome::Failed {
                    error: format!(
                        "Configuration error: step '{}' not found in agent '{}'.",
                        step.assigned_agent_step_name, step.assigned_agent_name
                    ),
                    result: None,
                    task_record_id: None,
                }
            }
            Resolution::Resolved { agent, step: agent_step } => self.invoke(agent, agent_step, plan, index).await,
        }
    }

    /// Call the worker step and record the call.
    pub async fn invoke(
        &self,
        agent: &AgentDefinition,
        agent_step: &AgentStep,
        plan: &OrchestrationPlan,
        index: usize,
    ) -> StepOutcome {
        let prompt = build_worker_prompt(agent_step, plan, index);
        let record = TaskExecutionRecord::start(
            &agent.id,
            &agent.name,
            &agent_step.id,
            &agent_step.name,
            &plan.steps[index].input_summary,
            &prompt,
        )
        .with_plan(plan.id);
        let request = GenerationRequest::for_step(agent, agent_step, prompt).with_plan(plan.id);

        tracing::debug!(
            plan_id = %plan.id,
            agent = %agent.name,
            step = %agent_step.name,
            client = self.client.name(),
            "Dispatching worker step"
        );

        let response = match self.step_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.client.generate(request)).await {
                Ok(response) => response,
                Err(_) => Err(GenerationError::Timeout(limit.as_secs())),
            },
            None => self.client.generate(request).await,
        };

        match response {
            Ok(response) if !response.text.trim().is_empty() => {
                let record = record.complete(&response.text);
                self.recorder.record_best_effort(&record).await;
                StepOutcome::Completed {
                    result: summarize(&response.text, self.result_max_chars),
                    task_record_id: Some(record.id),
                }
            }
            Ok(_) => {
                let error = format!("Agent '{}' returned an empty response.", agent.name);
                let record = record.fail(&error);
                self.recorder.record_best_effort(&record).await;
                StepOutcome::Failed {
                    error,
                    result: None,
                    task_record_id: Some(record.id),
                }
            }
            Err(e) => {
                tracing::warn!(plan_id = %plan.id, agent = %agent.name, error = %e, "Worker step failed");
                let record = record.fail(e.to_string());
                self.recorder.record_best_effort(&record).await;
                StepOutcome::Failed {
                    error: e.to_string(),
                    result: None,
                    task_record_id: Some(record.id),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::generation::{MockGenerationClient, MockReply};
    use crate::adapters::memory::InMemoryTaskRecorder;
    use crate::domain::models::{OrchestrationStep, StepOutcome, CAPABILITY_GAP_SENTINEL};

    fn writer() -> AgentDefinition {
        AgentDefinition::new("Writer", "")
            .with_step(AgentStep::new("Write", "Write about {{input}} for {{user_goal}}").with_id("write-step"))
    }

    fn plan_with(steps: Vec<OrchestrationStep>) -> OrchestrationPlan {
        OrchestrationPlan::pending_approval("tea blog", "raw", steps)
    }

    #[test]
    fn test_resolve_variants() {
        let agents = vec![writer()];
        assert!(matches!(resolve("Writer", "Write", &agents), Resolution::Resolved { .. }));
        assert_eq!(resolve("writer", "Write", &agents), Resolution::AgentNotFound);
        assert_eq!(resolve("Writer", "write", &agents), Resolution::StepNotFound);
        assert_eq!(resolve(CAPABILITY_GAP_SENTINEL, "N/A", &agents), Resolution::CapabilityGap);
    }

    #[test]
    fn test_worker_prompt_includes_context_and_previous_results() {
        let mut first = OrchestrationStep::new(1, "Research").with_assignment("Writer", "Write");
        first.status = StepStatus::Completed;
        first.result = Some("green, black".into());
        let second = OrchestrationStep::new(2, "Draft")
            .with_assignment("Writer", "Write")
            .with_input("keywords")
            .with_description("Write the draft");
        let plan = plan_with(vec![first, second]);

        let agent = writer();
        let prompt = build_worker_prompt(&agent.steps[0], &plan, 1);
        assert!(prompt.starts_with("Write about keywords for tea blog"));
        assert!(prompt.contains("Current task (Plan Step 2): Draft"));
        assert!(prompt.contains("Task description: Write the draft"));
        assert!(prompt.contains("[Plan Step 1: Research]\ngreen, black"));
        assert_eq!(step_values(&plan, 1).get("previous_output").map(String::as_str), Some("green, black"));
    }

    #[tokio::test]
    async fn test_dispatch_records_and_truncates() {
        let client = Arc::new(MockGenerationClient::new().with_default(MockReply::text("abcdefghij")));
        let recorder = Arc::new(InMemoryTaskRecorder::new());
        let dispatcher = WorkerDispatcher::new(client.clone(), recorder.clone()).with_result_max_chars(4);
        let plan = plan_with(vec![OrchestrationStep::new(1, "Draft").with_assignment("Writer", "Write")]);

        let outcome = dispatcher.dispatch(&plan, 0, &[writer()]).await;
        let StepOutcome::Completed { result, task_record_id } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(result, "abcd...");
        let records = recorder.list(None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(Some(records[0].id), task_record_id);
        assert_eq!(records[0].plan_id, Some(plan.id));
        assert_eq!(client.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_empty_text_fails() {
        let client = Arc::new(MockGenerationClient::new().with_default(MockReply::text("   ")));
        let dispatcher = WorkerDispatcher::new(client, Arc::new(InMemoryTaskRecorder::new()));
        let plan = plan_with(vec![OrchestrationStep::new(1, "Draft").with_assignment("Writer", "Write")]);
        let outcome = dispatcher.dispatch(&plan, 0, &[writer()]).await;
        assert_eq!(outcome.status(), StepStatus::Failed);
    }

    #[tokio::test]
    async fn test_dispatch_timeout_fails_step() {
        let client = Arc::new(MockGenerationClient::new().with_default(MockReply::Hang));
        let dispatcher =
            WorkerDispatcher::new(client, Arc::new(InMemoryTaskRecorder::new())).with_step_timeout_secs(1);
        let plan = plan_with(vec![OrchestrationStep::new(1, "Draft").with_assignment("Writer", "Write")]);

        tokio::time::pause();
        let outcome = dispatcher.dispatch(&plan, 0, &[writer()]).await;
        match outcome {
            StepOutcome::Failed { error, .. } => assert!(error.contains("timed out")),
            other => panic!("expected timeout failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_missing_agent_does_not_call_client() {
        let client = Arc::new(MockGenerationClient::new());
        let dispatcher = WorkerDispatcher::new(client.clone(), Arc::new(InMemoryTaskRecorder::new()));
        let plan = plan_with(vec![OrchestrationStep::new(1, "Draft").with_assignment("Ghost", "Write")]);
        match dispatcher.dispatch(&plan, 0, &[writer()]).await {
            StepOutcome::Failed { error, .. } => assert!(error.starts_with("Configuration error")),
            other => panic!("expected configuration failure, got {other:?}"),
        }
        assert!(client.calls().await.is_empty());
    }
}
