//! SQLite implementation of the AgentRepository.
//!
//! Searchable columns are stored alongside the full definition as JSON.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::AgentDefinition;
use crate::domain::ports::AgentRepository;

#[derive(Clone)]
pub struct SqliteAgentRepository {
    pool: SqlitePool,
}

impl SqliteAgentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentRepository for SqliteAgentRepository {
    async fn upsert(&self, agent: &AgentDefinition) -> DomainResult<()> {
        agent.validate()?;
        let definition = serde_json::to_string(agent)?;

        sqlx::query(
            r"INSERT INTO agents (id, name, description, is_predefined, definition, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, ?)
              ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                is_predefined = excluded.is_predefined,
                definition = excluded.definition,
                updated_at = excluded.updated_at",
        )
        .bind(&agent.id)
        .bind(&agent.name)
        .bind(&agent.description)
        .bind(i32::from(agent.is_predefined))
        .bind(&definition)
        .bind(agent.created_at.to_rfc3339())
        .bind(agent.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &str) -> DomainResult<Option<AgentDefinition>> {
        let row: Option<AgentRow> = sqlx::query_as("SELECT id, definition FROM agents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_name(&self, name: &str) -> DomainResult<Option<AgentDefinition>> {
        let row: Option<AgentRow> =
            sqlx::query_as("SELECT id, definition FROM agents WHERE name = ? ORDER BY created_at LIMIT 1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> DomainResult<Vec<AgentDefinition>> {
        let rows: Vec<AgentRow> = sqlx::query_as("SELECT id, definition FROM agents ORDER BY name, created_at")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM agents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::AgentNotFound(id.to_string()));
        }

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: String,
    definition: String,
}

impl TryFrom<AgentRow> for AgentDefinition {
    type Error = DomainError;

    fn try_from(row: AgentRow) -> Result<Self, Self::Error> {
        let agent: AgentDefinition = serde_json::from_str(&row.definition)
            .map_err(|e| DomainError::SerializationError(format!("Corrupt agent {}: {e}", row.id)))?;
        Ok(agent)
    }
}
