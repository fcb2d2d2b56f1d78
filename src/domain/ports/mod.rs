//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that adapters implement:
//! - AgentRepository: agent catalogue storage
//! - PlanRepository: orchestration plan storage
//! - TaskRecorder: generation call analytics
//! - GenerationClient: language model backends

pub mod agent_repository;
pub mod generation_client;
pub mod null_recorder;
pub mod plan_repository;
pub mod task_recorder;

pub use agent_repository::AgentRepository;
pub use generation_client::{GenerationClient, GenerationError, GenerationRequest, GenerationResponse};
pub use null_recorder::NullTaskRecorder;
pub use plan_repository::{PlanFilter, PlanRepository, DEFAULT_PLANS_PER_PAGE};
pub use task_recorder::TaskRecorder;
