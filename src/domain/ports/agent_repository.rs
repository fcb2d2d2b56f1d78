//! Agent repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::AgentDefinition;

/// Repository interface for agent definitions.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Insert or replace an agent, keyed by id.
    async fn upsert(&self, agent: &AgentDefinition) -> DomainResult<()>;

    /// Get an agent by id.
    async fn get(&self, id: &str) -> DomainResult<Option<AgentDefinition>>;

    /// Get an agent by its exact, case-sensitive name.
    async fn get_by_name(&self, name: &str) -> DomainResult<Option<AgentDefinition>>;

    /// List all agents ordered by name.
    async fn list(&self) -> DomainResult<Vec<AgentDefinition>>;

    /// Delete an agent by id.
    async fn delete(&self, id: &str) -> DomainResult<()>;
}
