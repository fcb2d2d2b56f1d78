pub mod agent;
pub mod config;
pub mod plan;
pub mod task_record;

pub use agent::{
    AgentDefinition, AgentStep, AgentTool, ProviderType, RagResource, RagResourceType, DEFAULT_MODEL,
    MAESTRO_AGENT_ID,
};
pub use config::{
    Config, DatabaseConfig, ExecutionConfig, GeminiProviderConfig, GenericRestProviderConfig, LoggingConfig,
    PlannerConfig, ProvidersConfig,
};
pub use plan::{
    is_capability_gap, OrchestrationPlan, OrchestrationStep, PlanStatus, StepOutcome, StepStatus, CAPABILITY_GAP_SENTINEL,
};
pub use task_record::{approx_tokens, summarize, TaskExecutionRecord, TaskRecordStatus};
