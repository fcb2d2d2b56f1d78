//! SQLite implementation of the TaskRecorder.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{TaskExecutionRecord, TaskRecordStatus};
use crate::domain::ports::TaskRecorder;

#[derive(Clone)]
pub struct SqliteTaskRecordRepository {
    pool: SqlitePool,
}

impl SqliteTaskRecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRecorder for SqliteTaskRecordRepository {
    async fn record(&self, record: &TaskExecutionRecord) -> DomainResult<()> {
        sqlx::query(
            r"INSERT INTO task_records (id, agent_id, agent_name, step_id, step_name, plan_id, status,
                 started_at, completed_at, duration_ms, input_summary, output_summary, error,
                 approx_input_tokens, approx_output_tokens)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
              ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                completed_at = excluded.completed_at,
                duration_ms = excluded.duration_ms,
                output_summary = excluded.output_summary,
                error = excluded.error,
                approx_output_tokens = excluded.approx_output_tokens",
        )
        .bind(record.id.to_string())
        .bind(&record.agent_id)
        .bind(&record.agent_name)
        .bind(&record.step_id)
        .bind(&record.step_name)
        .bind(record.plan_id.map(|id| id.to_string()))
        .bind(record.status.as_str())
        .bind(record.started_at.to_rfc3339())
        .bind(record.completed_at.map(|t| t.to_rfc3339()))
        .bind(record.duration_ms.map(|ms| i64::try_from(ms).unwrap_or(i64::MAX)))
        .bind(&record.input_summary)
        .bind(&record.output_summary)
        .bind(&record.error)
        .bind(i64::from(record.approx_input_tokens))
        .bind(i64::from(record.approx_output_tokens))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, agent_id: Option<&str>) -> DomainResult<Vec<TaskExecutionRecord>> {
        let rows: Vec<TaskRecordRow> = match agent_id {
            Some(agent_id) => {
                sqlx::query_as("SELECT * FROM task_records WHERE agent_id = ? ORDER BY started_at DESC")
                    .bind(agent_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM task_records ORDER BY started_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct TaskRecordRow {
    id: String,
    agent_id: String,
    agent_name: String,
    step_id: String,
    step_name: String,
    plan_id: Option<String>,
    status: String,
    started_at: String,
    completed_at: Option<String>,
    duration_ms: Option<i64>,
    input_summary: String,
    output_summary: Option<String>,
    error: Option<String>,
    approx_input_tokens: i64,
    approx_output_tokens: i64,
}

impl TryFrom<TaskRecordRow> for TaskExecutionRecord {
    type Error = DomainError;

    fn try_from(row: TaskRecordRow) -> Result<Self, Self::Error> {
        let status = TaskRecordStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid record status: {}", row.status)))?;

        Ok(TaskExecutionRecord {
            id: super::parse_uuid(&row.id)?,
            agent_id: row.agent_id,
            agent_name: row.agent_name,
            step_id: row.step_id,
            step_name: row.step_name,
            plan_id: super::parse_optional_uuid(row.plan_id)?,
            status,
            started_at: super::parse_datetime(&row.started_at)?,
            completed_at: super::parse_optional_datetime(row.completed_at)?,
            duration_ms: row.duration_ms.and_then(|ms| u64::try_from(ms).ok()),
            input_summary: row.input_summary,
            output_summary: row.output_summary,
            error: row.error,
            approx_input_tokens: u32::try_from(row.approx_input_tokens).unwrap_or(u32::MAX),
            approx_output_tokens: u32::try_from(row.approx_output_tokens).unwrap_or(u32::MAX),
        })
    }
}
