//! Common test utilities for integration tests
//!
//! Provides an in-memory harness wiring the agent, plan and record stores to
//! a scripted generation client, plus helpers for building plans.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use maestro::adapters::generation::MockGenerationClient;
use maestro::adapters::memory::{InMemoryAgentRepository, InMemoryPlanRepository, InMemoryTaskRecorder};
use maestro::domain::models::{
    AgentDefinition, AgentStep, OrchestrationPlan, OrchestrationStep, PlanStatus, StepStatus,
};
use maestro::domain::ports::{AgentRepository, PlanRepository};
use maestro::services::{seed_builtin_agents, PlanEngine, PlannerService, WorkerDispatcher};
use uuid::Uuid;

pub type Engine = PlanEngine<InMemoryPlanRepository, InMemoryAgentRepository>;
pub type Planner = PlannerService<InMemoryAgentRepository, InMemoryPlanRepository>;

/// Name of the worker agent every harness registers.
pub const WORKER: &str = "Pipeline Worker";
/// Step names of [`WORKER`]; step ids are the lowercase letters.
pub const WORKER_STEPS: [&str; 5] = ["Step A", "Step B", "Step C", "Step D", "Step E"];

pub struct Harness {
    pub agents: Arc<InMemoryAgentRepository>,
    pub plans: Arc<InMemoryPlanRepository>,
    pub recorder: Arc<InMemoryTaskRecorder>,
    pub client: Arc<MockGenerationClient>,
    pub engine: Arc<Engine>,
}

/// Step id of the worker step with the given name, e.g. "Step C" -> "c".
pub fn step_id(step_name: &str) -> String {
    step_name.trim_start_matches("Step ").to_lowercase()
}

pub fn worker_agent() -> AgentDefinition {
    WORKER_STEPS.iter().fold(
        AgentDefinition::new(WORKER, "Runs one stage of a pipeline.").with_id("pipeline_worker"),
        |agent, name| {
            agent.with_step(AgentStep::new(*name, format!("Perform {name} for {{{{user_goal}}}}")).with_id(step_id(name)))
        },
    )
}

pub async fn harness(client: MockGenerationClient) -> Harness {
    harness_with_timeout(client, 0).await
}

pub async fn harness_with_timeout(client: MockGenerationClient, step_timeout_secs: u64) -> Harness {
    let agents = Arc::new(InMemoryAgentRepository::new());
    seed_builtin_agents(agents.as_ref()).await.expect("seed built-in agents");
    agents.upsert(&worker_agent()).await.expect("register worker agent");

    let plans = Arc::new(InMemoryPlanRepository::new());
    let recorder = Arc::new(InMemoryTaskRecorder::new());
    let client = Arc::new(client);
    let dispatcher =
        WorkerDispatcher::new(client.clone(), recorder.clone()).with_step_timeout_secs(step_timeout_secs);
    let engine = Arc::new(PlanEngine::new(plans.clone(), agents.clone(), dispatcher));

    Harness { agents, plans, recorder, client, engine }
}

impl Harness {
    pub fn planner(&self) -> Planner {
        PlannerService::new(
            self.agents.clone(),
            self.plans.clone(),
            self.client.clone(),
            self.recorder.clone(),
        )
    }

    /// Save a plan pending approval with one step per `(agent, step)` pair.
    pub async fn pending_plan(&self, assignments: &[(&str, &str)]) -> Uuid {
        let steps = assignments
            .iter()
            .zip(1..)
            .map(|((agent, step), n)| {
                OrchestrationStep::new(n, format!("Task {n}"))
                    .with_assignment(*agent, *step)
                    .with_input(format!("input {n}"))
            })
            .collect();
        let plan = OrchestrationPlan::pending_approval("Ship the pipeline", "raw plan", steps);
        self.plans.save(&plan).await.expect("save plan");
        plan.id
    }

    /// Pending plan running the first `n` worker steps in order.
    pub async fn worker_plan(&self, n: usize) -> Uuid {
        let assignments: Vec<(&str, &str)> = WORKER_STEPS[..n].iter().map(|s| (WORKER, *s)).collect();
        self.pending_plan(&assignments).await
    }

    pub async fn plan(&self, id: Uuid) -> OrchestrationPlan {
        self.plans.get(id).await.expect("load plan").expect("plan exists")
    }

    /// Poll the store until step `index` reaches `status`.
    pub async fn wait_for_step(&self, id: Uuid, index: usize, status: StepStatus) {
        for _ in 0..500 {
            if self.plan(id).await.steps[index].status == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("step {} never reached {}", index + 1, status.as_str());
    }
}

pub fn statuses(plan: &OrchestrationPlan) -> Vec<StepStatus> {
    plan.steps.iter().map(|s| s.status).collect()
}

pub fn assert_plan_status(plan: &OrchestrationPlan, expected: PlanStatus) {
    assert_eq!(
        plan.status,
        expected,
        "plan {} is {} (error: {:?})",
        plan.id,
        plan.status.as_str(),
        plan.error
    );
}

/// Initializes tracing output for a test run.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
