//! Task recorder port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::TaskExecutionRecord;

/// Sink for generation call analytics.
#[async_trait]
pub trait TaskRecorder: Send + Sync {
    /// Persist a record, replacing any earlier version with the same id.
    async fn record(&self, record: &TaskExecutionRecord) -> DomainResult<()>;

    /// List records, newest first, optionally for one agent.
    async fn list(&self, agent_id: Option<&str>) -> DomainResult<Vec<TaskExecutionRecord>>;

    /// Record without letting a storage failure reach the caller.
    async fn record_best_effort(&self, record: &TaskExecutionRecord) {
        if let Err(e) = self.record(record).await {
            tracing::warn!(record_id = %record.id, error = %e, "Failed to store task execution record");
        }
    }
}
