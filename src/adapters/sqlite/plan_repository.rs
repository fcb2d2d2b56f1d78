//! SQLite implementation of the PlanRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{OrchestrationPlan, OrchestrationStep, PlanStatus};
use crate::domain::ports::{PlanFilter, PlanRepository};

#[derive(Clone)]
pub struct SqlitePlanRepository {
    pool: SqlitePool,
}

impl SqlitePlanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// WHERE clause and bindings for the status and search criteria.
fn filter_clause(filter: &PlanFilter) -> (String, Vec<String>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut bindings = Vec::new();

    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        bindings.push(status.as_str().to_string());
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        sql.push_str(" AND instr(lower(user_goal), ?) > 0");
        bindings.push(term.to_lowercase());
    }

    (sql, bindings)
}

#[async_trait]
impl PlanRepository for SqlitePlanRepository {
    async fn save(&self, plan: &OrchestrationPlan) -> DomainResult<()> {
        let steps_json = serde_json::to_string(&plan.steps)?;

        sqlx::query(
            r"INSERT INTO plans (id, user_goal, raw_plan_text, steps, status, current_step_index,
                 overall_progress, error, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
              ON CONFLICT(id) DO UPDATE SET
                user_goal = excluded.user_goal,
                raw_plan_text = excluded.raw_plan_text,
                steps = excluded.steps,
                status = excluded.status,
                current_step_index = excluded.current_step_index,
                overall_progress = excluded.overall_progress,
                error = excluded.error,
                updated_at = excluded.updated_at",
        )
        .bind(plan.id.to_string())
        .bind(&plan.user_goal)
        .bind(&plan.raw_plan_text)
        .bind(&steps_json)
        .bind(plan.status.as_str())
        .bind(i64::try_from(plan.current_step_index).unwrap_or(i64::MAX))
        .bind(i64::from(plan.overall_progress))
        .bind(&plan.error)
        .bind(plan.created_at.to_rfc3339())
        .bind(plan.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<OrchestrationPlan>> {
        let row: Option<PlanRow> = sqlx::query_as("SELECT * FROM plans WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self, filter: &PlanFilter) -> DomainResult<Vec<OrchestrationPlan>> {
        let (clause, bindings) = filter_clause(filter);
        let sql = format!("SELECT * FROM plans{clause} ORDER BY created_at DESC, id LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, PlanRow>(&sql);
        for binding in &bindings {
            q = q.bind(binding);
        }
        let rows: Vec<PlanRow> = q
            .bind(i64::try_from(filter.per_page).unwrap_or(i64::MAX))
            .bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count(&self, filter: &PlanFilter) -> DomainResult<u64> {
        let (clause, bindings) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM plans{clause}");

        let mut q = sqlx::query_as::<_, (i64,)>(&sql);
        for binding in &bindings {
            q = q.bind(binding);
        }
        let (count,) = q.fetch_one(&self.pool).await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM plans WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::PlanNotFound(id));
        }

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct PlanRow {
    id: String,
    user_goal: String,
    raw_plan_text: String,
    steps: String,
    status: String,
    current_step_index: i64,
    overall_progress: i64,
    error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<PlanRow> for OrchestrationPlan {
    type Error = DomainError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let id = super::parse_uuid(&row.id)?;
        let status = PlanStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid plan status: {}", row.status)))?;
        let steps: Vec<OrchestrationStep> = serde_json::from_str(&row.steps)?;

        Ok(OrchestrationPlan {
            id,
            user_goal: row.user_goal,
            raw_plan_text: row.raw_plan_text,
            steps,
            status,
            current_step_index: usize::try_from(row.current_step_index).unwrap_or(0),
            overall_progress: u8::try_from(row.overall_progress.clamp(0, 100)).unwrap_or(0),
            error: row.error,
            created_at: super::parse_datetime(&row.created_at)?,
            updated_at: super::parse_datetime(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use chrono::{Duration, Utc};

    async fn setup_test_repo() -> SqlitePlanRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqlitePlanRepository::new(pool)
    }

    fn two_step_plan(goal: &str) -> OrchestrationPlan {
        let steps = vec![
            OrchestrationStep::new(1, "Research").with_assignment("Keyword Researcher", "Find Keywords"),
            OrchestrationStep::new(2, "Write").with_assignment("Content Writer", "Write Draft"),
        ];
        OrchestrationPlan::pending_approval(goal, "raw plan", steps)
    }

    #[tokio::test]
    async fn test_save_and_get_roundtrip() {
        let repo = setup_test_repo().await;
        let plan = two_step_plan("Write a blog post");
        repo.save(&plan).await.unwrap();

        let loaded = repo.get(plan.id).await.unwrap().unwrap();
        assert_eq!(loaded, plan);
        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let repo = setup_test_repo().await;
        let mut plan = two_step_plan("goal");
        repo.save(&plan).await.unwrap();

        plan.transition_to(PlanStatus::Approved).unwrap();
        repo.save(&plan).await.unwrap();

        assert_eq!(repo.get(plan.id).await.unwrap().unwrap().status, PlanStatus::Approved);
        assert_eq!(repo.count(&PlanFilter::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let repo = setup_test_repo().await;
        let base = Utc::now();
        for i in 0..6 {
            let mut plan = two_step_plan(&format!("Blog post number {i}"));
            plan.created_at = base + Duration::seconds(i);
            repo.save(&plan).await.unwrap();
        }
        let mut other = OrchestrationPlan::malformed("Analyze SALES data", "???", "unparseable");
        other.created_at = base + Duration::seconds(10);
        repo.save(&other).await.unwrap();

        let first = repo.list(&PlanFilter::default()).await.unwrap();
        assert_eq!(first.len(), 5);
        assert_eq!(first[0].user_goal, "Analyze SALES data");

        let second = repo.list(&PlanFilter { page: 2, ..Default::default() }).await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].user_goal, "Blog post number 0");

        let search = PlanFilter { search: Some("sales".into()), ..Default::default() };
        assert_eq!(repo.count(&search).await.unwrap(), 1);

        let failed = PlanFilter { status: Some(PlanStatus::Failed), ..Default::default() };
        assert_eq!(repo.list(&failed).await.unwrap().len(), 1);

        let pending = PlanFilter {
            status: Some(PlanStatus::PendingApproval),
            search: Some("BLOG".into()),
            ..Default::default()
        };
        assert_eq!(repo.count(&pending).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup_test_repo().await;
        let plan = two_step_plan("goal");
        repo.save(&plan).await.unwrap();

        repo.delete(plan.id).await.unwrap();
        assert!(matches!(repo.delete(plan.id).await, Err(DomainError::PlanNotFound(_))));
    }
}
