//! In-memory store adapters.
//!
//! Process-local implementations of the repository ports, used by tests and
//! by embedders that do not need persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AgentDefinition, OrchestrationPlan, TaskExecutionRecord};
use crate::domain::ports::{AgentRepository, PlanFilter, PlanRepository, TaskRecorder};

#[derive(Debug, Default)]
pub struct InMemoryAgentRepository {
    agents: RwLock<HashMap<String, AgentDefinition>>,
}

impl InMemoryAgentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn upsert(&self, agent: &AgentDefinition) -> DomainResult<()> {
        agent.validate()?;
        self.agents.write().await.insert(agent.id.clone(), agent.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> DomainResult<Option<AgentDefinition>> {
        Ok(self.agents.read().await.get(id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> DomainResult<Option<AgentDefinition>> {
        let agents = self.agents.read().await;
        Ok(agents
            .values()
            .filter(|a| a.name == name)
            .min_by_key(|a| a.created_at)
            .cloned())
    }

    async fn list(&self) -> DomainResult<Vec<AgentDefinition>> {
        let mut agents: Vec<_> = self.agents.read().await.values().cloned().collect();
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(agents)
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        match self.agents.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(DomainError::AgentNotFound(id.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPlanRepository {
    plans: RwLock<HashMap<Uuid, OrchestrationPlan>>,
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn matching(&self, filter: &PlanFilter) -> Vec<OrchestrationPlan> {
        let mut plans: Vec<_> = self
            .plans
            .read()
            .await
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        plans
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn save(&self, plan: &OrchestrationPlan) -> DomainResult<()> {
        self.plans.write().await.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<OrchestrationPlan>> {
        Ok(self.plans.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &PlanFilter) -> DomainResult<Vec<OrchestrationPlan>> {
        Ok(self
            .matching(filter)
            .await
            .into_iter()
            .skip(filter.offset())
            .take(filter.per_page)
            .collect())
    }

    async fn count(&self, filter: &PlanFilter) -> DomainResult<u64> {
        Ok(self.matching(filter).await.len() as u64)
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        match self.plans.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(DomainError::PlanNotFound(id)),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTaskRecorder {
    records: RwLock<Vec<TaskExecutionRecord>>,
}

impl InMemoryTaskRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRecorder for InMemoryTaskRecorder {
    async fn record(&self, record: &TaskExecutionRecord) -> DomainResult<()> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn list(&self, agent_id: Option<&str>) -> DomainResult<Vec<TaskExecutionRecord>> {
        let mut records: Vec<_> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| agent_id.is_none_or(|id| r.agent_id == id))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AgentStep, PlanStatus};
    use chrono::Duration;

    #[tokio::test]
    async fn test_agent_repository_roundtrip() {
        let repo = InMemoryAgentRepository::new();
        let agent = AgentDefinition::new("Writer", "w").with_step(AgentStep::new("Write", "x"));
        repo.upsert(&agent).await.unwrap();

        assert_eq!(repo.get(&agent.id).await.unwrap(), Some(agent.clone()));
        assert!(repo.get_by_name("Writer").await.unwrap().is_some());
        assert!(repo.get_by_name("writer").await.unwrap().is_none());

        repo.delete(&agent.id).await.unwrap();
        assert!(repo.delete(&agent.id).await.is_err());
    }

    #[tokio::test]
    async fn test_agent_repository_rejects_invalid() {
        let repo = InMemoryAgentRepository::new();
        assert!(repo.upsert(&AgentDefinition::new("", "")).await.is_err());
    }

    #[tokio::test]
    async fn test_plan_list_newest_first_with_pages() {
        let repo = InMemoryPlanRepository::new();
        let base = chrono::Utc::now();
        for i in 0..7 {
            let mut plan = OrchestrationPlan::new(format!("goal {i}"), "raw");
            plan.created_at = base + Duration::seconds(i);
            repo.save(&plan).await.unwrap();
        }

        let first = repo.list(&PlanFilter::default()).await.unwrap();
        assert_eq!(first.len(), 5);
        assert_eq!(first[0].user_goal, "goal 6");

        let second = repo.list(&PlanFilter { page: 2, ..Default::default() }).await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].user_goal, "goal 0");
        assert_eq!(repo.count(&PlanFilter::default()).await.unwrap(), 7);

        let filtered = PlanFilter { status: Some(PlanStatus::Running), ..Default::default() };
        assert_eq!(repo.count(&filtered).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_task_recorder_filters_by_agent() {
        let recorder = InMemoryTaskRecorder::new();
        let a = TaskExecutionRecord::start("a", "A", "s", "S", "in", "p").complete("out");
        let b = TaskExecutionRecord::start("b", "B", "s", "S", "in", "p");
        recorder.record(&a).await.unwrap();
        recorder.record(&b).await.unwrap();
        recorder.record(&b.clone().fail("x")).await.unwrap();

        assert_eq!(recorder.list(None).await.unwrap().len(), 2);
        let only_b = recorder.list(Some("b")).await.unwrap();
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b[0].error.as_deref(), Some("x"));
    }
}
