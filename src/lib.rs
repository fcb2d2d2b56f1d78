//! Maestro - Orchestration Plan Engine
//!
//! Maestro turns a user goal into an ordered orchestration plan using a
//! planner agent, waits for approval, then executes the plan step by step by
//! dispatching each step to a worker agent backed by an LLM provider.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Agents, plans, task records and the ports they are stored and generated through
//! - **Service Layer** (`services`): Planning, plan parsing, worker dispatch and the plan engine
//! - **Adapters** (`adapters`): SQLite and in-memory stores, Gemini and generic REST generation clients
//! - **Infrastructure Layer** (`infrastructure`): Configuration loading and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use maestro::adapters::generation::ProviderRouter;
//! use maestro::adapters::memory::{InMemoryAgentRepository, InMemoryPlanRepository, InMemoryTaskRecorder};
//! use maestro::services::{seed_builtin_agents, DraftOutcome, PlanEngine, PlannerService, WorkerDispatcher};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let agents = Arc::new(InMemoryAgentRepository::new());
//!     seed_builtin_agents(agents.as_ref()).await?;
//!     let plans = Arc::new(InMemoryPlanRepository::new());
//!     let recorder = Arc::new(InMemoryTaskRecorder::new());
//!     let client = Arc::new(ProviderRouter::from_config(&Default::default())?);
//!
//!     let planner = PlannerService::new(agents.clone(), plans.clone(), client.clone(), recorder.clone());
//!     if let DraftOutcome::Plan(plan) = planner.draft_plan("Summarize this week's changelog").await? {
//!         let engine = PlanEngine::new(plans, agents, WorkerDispatcher::new(client, recorder));
//!         engine.approve(plan.id).await?;
//!         engine.run(plan.id).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    AgentDefinition, AgentStep, Config, OrchestrationPlan, OrchestrationStep, PlanStatus, ProviderType, StepStatus,
    TaskExecutionRecord,
};
pub use domain::ports::{
    AgentRepository, GenerationClient, GenerationError, GenerationRequest, GenerationResponse, PlanFilter,
    PlanRepository, TaskRecorder,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{DraftOutcome, PlanEngine, PlannerService, WorkerDispatcher};
