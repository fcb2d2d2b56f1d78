//! Plan repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{OrchestrationPlan, PlanStatus};

pub const DEFAULT_PLANS_PER_PAGE: usize = 5;

/// Filter criteria for listing plans.
#[derive(Debug, Clone)]
pub struct PlanFilter {
    pub status: Option<PlanStatus>,
    /// Case-insensitive substring of the user goal
    pub search: Option<String>,
    /// 1-based page number
    pub page: usize,
    pub per_page: usize,
}

impl Default for PlanFilter {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            page: 1,
            per_page: DEFAULT_PLANS_PER_PAGE,
        }
    }
}

impl PlanFilter {
    /// Rows to skip for the requested page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    /// Whether a plan passes the status and search criteria.
    pub fn matches(&self, plan: &OrchestrationPlan) -> bool {
        if self.status.is_some_and(|s| s != plan.status) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => plan.user_goal.to_lowercase().contains(&term.to_lowercase()),
            _ => true,
        }
    }
}

/// Repository interface for orchestration plans.
///
/// Plans are written whole; callers serialize read-modify-write cycles.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Insert or replace a plan.
    async fn save(&self, plan: &OrchestrationPlan) -> DomainResult<()>;

    /// Get a plan by id.
    async fn get(&self, id: Uuid) -> DomainResult<Option<OrchestrationPlan>>;

    /// List one page of plans, newest first.
    async fn list(&self, filter: &PlanFilter) -> DomainResult<Vec<OrchestrationPlan>>;

    /// Count plans matching the filter, ignoring pagination.
    async fn count(&self, filter: &PlanFilter) -> DomainResult<u64>;

    /// Delete a plan by id.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;
}
