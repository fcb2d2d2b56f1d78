//! Null task recorder implementation.
//!
//! Used when analytics are not needed but the type system requires a
//! `TaskRecorder`.

use async_trait::async_trait;

use super::TaskRecorder;
use crate::domain::errors::DomainResult;
use crate::domain::models::TaskExecutionRecord;

/// A no-op recorder that stores nothing.
#[derive(Debug, Clone, Default)]
pub struct NullTaskRecorder;

impl NullTaskRecorder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskRecorder for NullTaskRecorder {
    async fn record(&self, _record: &TaskExecutionRecord) -> DomainResult<()> {
        Ok(())
    }

    async fn list(&self, _agent_id: Option<&str>) -> DomainResult<Vec<TaskExecutionRecord>> {
        Ok(Vec::new())
    }
}
