//! Application services: planning, parsing and plan execution.

pub mod agent_summary;
pub mod builtin_agents;
pub mod dispatch;
pub mod plan_engine;
pub mod plan_parser;
pub mod planner;
pub mod template;

pub use agent_summary::build_agent_summary;
pub use builtin_agents::{builtin_agents, maestro_agent, seed_builtin_agents};
pub use dispatch::WorkerDispatcher;
pub use plan_engine::PlanEngine;
pub use plan_parser::{parse_plan, PlanParseOutcome};
pub use planner::{ChatReply, ChatRole, ChatTurn, DraftOutcome, PlannerService};
