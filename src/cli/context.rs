//! Wiring of stores, generation backends and services for one CLI invocation.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::generation::ProviderRouter;
use crate::adapters::sqlite::{
    database_url, initialize_database, PoolConfig, SqliteAgentRepository, SqlitePlanRepository,
    SqliteTaskRecordRepository,
};
use crate::domain::models::Config;
use crate::domain::ports::GenerationClient;
use crate::services::{seed_builtin_agents, PlanEngine, PlannerService, WorkerDispatcher};

pub type SqlitePlanEngine = PlanEngine<SqlitePlanRepository, SqliteAgentRepository>;
pub type SqlitePlanner = PlannerService<SqliteAgentRepository, SqlitePlanRepository>;

pub struct AppContext {
    pub config: Config,
    pub agents: Arc<SqliteAgentRepository>,
    pub plans: Arc<SqlitePlanRepository>,
    pub recorder: Arc<SqliteTaskRecordRepository>,
    client: Arc<dyn GenerationClient>,
}

impl AppContext {
    /// Open the project database and make sure the built-in agents exist.
    pub async fn open(config: Config) -> Result<Self> {
        let url = database_url(&config.database.path);
        let pool = initialize_database(&url, Some(PoolConfig::from(&config.database)))
            .await
            .with_context(|| format!("Failed to open database at {}. Run 'maestro init' first.", config.database.path))?;

        let agents = Arc::new(SqliteAgentRepository::new(pool.clone()));
        let seeded = seed_builtin_agents(agents.as_ref())
            .await
            .context("Failed to seed built-in agents")?;
        if seeded > 0 {
            tracing::info!(seeded, "Seeded built-in agents");
        }

        let client = ProviderRouter::from_config(&config.providers).context("Failed to configure generation providers")?;

        Ok(Self {
            agents,
            plans: Arc::new(SqlitePlanRepository::new(pool.clone())),
            recorder: Arc::new(SqliteTaskRecordRepository::new(pool)),
            client: Arc::new(client),
            config,
        })
    }

    pub fn planner(&self) -> SqlitePlanner {
        PlannerService::new(
            Arc::clone(&self.agents),
            Arc::clone(&self.plans),
            Arc::clone(&self.client),
            self.recorder.clone(),
        )
        .with_config(self.config.planner.clone())
    }

    pub fn engine(&self) -> Arc<SqlitePlanEngine> {
        let dispatcher = WorkerDispatcher::new(Arc::clone(&self.client), self.recorder.clone())
            .with_step_timeout_secs(self.config.execution.step_timeout_secs)
            .with_result_max_chars(self.config.execution.result_max_chars);
        Arc::new(PlanEngine::new(Arc::clone(&self.plans), Arc::clone(&self.agents), dispatcher))
    }
}
