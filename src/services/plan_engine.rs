//! Plan execution engine.
//!
//! Drives an approved plan through its steps strictly in order: step N+1 is
//! never dispatched before step N has settled. Every plan write is a whole
//! read-modify-write under one engine-wide lock, shared by the run loop and
//! `cancel`, so a cancellation is never overwritten by a stale step commit.
//!
//! Step-level problems (missing agents, backend errors, timeouts) end up on
//! the step and plan in the store. Only storage failures are returned.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AgentDefinition, OrchestrationPlan, PlanStatus, StepOutcome, StepStatus};
use crate::domain::ports::{AgentRepository, PlanRepository};
use crate::services::dispatch::WorkerDispatcher;

/// Runs orchestration plans against the worker agent catalogue.
pub struct PlanEngine<P: PlanRepository, A: AgentRepository> {
    plans: Arc<P>,
    agents: Arc<A>,
    dispatcher: WorkerDispatcher,
    write_lock: Mutex<()>,
    running: StdMutex<HashMap<Uuid, CancellationToken>>,
}

impl<P: PlanRepository + 'static, A: AgentRepository + 'static> PlanEngine<P, A> {
    pub fn new(plans: Arc<P>, agents: Arc<A>, dispatcher: WorkerDispatcher) -> Self {
        Self {
            plans,
            agents,
            dispatcher,
            write_lock: Mutex::new(()),
            running: StdMutex::new(HashMap::new()),
        }
    }

    async fn load(&self, plan_id: Uuid) -> DomainResult<OrchestrationPlan> {
        self.plans.get(plan_id).await?.ok_or(DomainError::PlanNotFound(plan_id))
    }

    /// Get a plan by id.
    pub async fn get(&self, plan_id: Uuid) -> DomainResult<OrchestrationPlan> {
        self.load(plan_id).await
    }

    /// Apply a status transition under the write lock.
    async fn transition(&self, plan_id: Uuid, status: PlanStatus) -> DomainResult<OrchestrationPlan> {
        let _guard = self.write_lock.lock().await;
        let mut plan = self.load(plan_id).await?;
        plan.transition_to(status)?;
        self.plans.save(&plan).await?;
        tracing::info!(plan_id = %plan_id, status = status.as_str(), "Plan status changed");
        Ok(plan)
    }

    /// Approve a plan that is pending approval.
    pub async fn approve(&self, plan_id: Uuid) -> DomainResult<OrchestrationPlan> {
        self.transition(plan_id, PlanStatus::Approved).await
    }

    /// Whether this engine is currently driving the plan.
    pub fn is_running(&self, plan_id: Uuid) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&plan_id)
    }

    fn register(&self, plan_id: Uuid) -> DomainResult<CancellationToken> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.contains_key(&plan_id) {
            return Err(DomainError::ValidationFailed(format!("Plan {plan_id} is already being executed")));
        }
        let token = CancellationToken::new();
        running.insert(plan_id, token.clone());
        Ok(token)
    }

    fn unregister(&self, plan_id: Uuid) {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&plan_id);
    }

    /// Start a pending or approved plan and execute it to the end.
    ///
    /// Returns the plan as stored once the run settles: completed, failed
    /// or cancelled.
    pub async fn run(&self, plan_id: Uuid) -> DomainResult<OrchestrationPlan> {
        let token = self.register(plan_id)?;
        if let Err(e) = self.transition(plan_id, PlanStatus::Running).await {
            self.unregister(plan_id);
            return Err(e);
        }
        self.drive(plan_id, token).await
    }

    /// Continue a running plan from its cursor, e.g. after a crash.
    ///
    /// A step left in progress by the interrupted run is dispatched again.
    pub async fn resume(&self, plan_id: Uuid) -> DomainResult<OrchestrationPlan> {
        let plan = self.load(plan_id).await?;
        if plan.status != PlanStatus::Running {
            return Err(DomainError::ValidationFailed(format!(
                "Plan {plan_id} is {}, only running plans can be resumed",
                plan.status.as_str()
            )));
        }
        let token = self.register(plan_id)?;
        tracing::info!(plan_id = %plan_id, cursor = plan.current_step_index, "Resuming plan");
        self.drive(plan_id, token).await
    }

    /// Run a plan on its own task.
    pub fn spawn_run(self: &Arc<Self>, plan_id: Uuid) -> JoinHandle<DomainResult<OrchestrationPlan>> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run(plan_id).await })
    }

    async fn drive(&self, plan_id: Uuid, token: CancellationToken) -> DomainResult<OrchestrationPlan> {
        // Steps resolve against workers only; the planner is never a worker.
        let result = match self.agents.list().await {
            Ok(agents) => {
                let workers: Vec<AgentDefinition> = agents.into_iter().filter(|a| !a.is_maestro()).collect();
                self.drive_steps(plan_id, &token, &workers).await
            }
            Err(e) => Err(e),
        };
        self.unregister(plan_id);

        if let Err(e) = &result {
            tracing::error!(plan_id = %plan_id, error = %e, "Plan execution aborted");
        }
        result?;

        let plan = self.load(plan_id).await?;
        tracing::info!(
            plan_id = %plan_id,
            status = plan.status.as_str(),
            progress = plan.overall_progress,
            "Plan execution finished"
        );
        Ok(plan)
    }

    async fn drive_steps(
        &self,
        plan_id: Uuid,
        token: &CancellationToken,
        agents: &[AgentDefinition],
    ) -> DomainResult<()> {
        loop {
            if token.is_cancelled() {
                return Ok(());
            }
            let Some((plan, index)) = self.begin_next_step(plan_id).await? else {
                return Ok(());
            };

            let outcome = tokio::select! {
                () = token.cancelled() => {
                    tracing::info!(plan_id = %plan_id, step = index + 1, "Abandoning in-flight step after cancellation");
                    return Ok(());
                }
                outcome = self.dispatcher.dispatch(&plan, index, agents) => outcome,
            };

            if !self.commit_step(plan_id, index, outcome).await? {
                return Ok(());
            }
        }
    }

    /// Mark the step at the cursor in progress.
    ///
    /// Returns `None` when the plan stopped running or just completed.
    async fn begin_next_step(&self, plan_id: Uuid) -> DomainResult<Option<(OrchestrationPlan, usize)>> {
        let _guard = self.write_lock.lock().await;
        let mut plan = self.load(plan_id).await?;
        if plan.status != PlanStatus::Running {
            tracing::debug!(plan_id = %plan_id, status = plan.status.as_str(), "Plan no longer running");
            return Ok(None);
        }

        let started = plan.begin_current_step()?;
        self.plans.save(&plan).await?;
        match started {
            Some(index) => {
                tracing::info!(
                    plan_id = %plan_id,
                    step = plan.steps[index].serial_number,
                    task = %plan.steps[index].task_name,
                    "Starting plan step"
                );
                Ok(Some((plan, index)))
            }
            None => Ok(None),
        }
    }

    /// Store a step outcome. Returns whether the plan keeps running.
    async fn commit_step(&self, plan_id: Uuid, index: usize, outcome: StepOutcome) -> DomainResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut plan = self.load(plan_id).await?;
        let step_status = plan.steps.get(index).map(|s| s.status);
        if plan.status != PlanStatus::Running || step_status != Some(StepStatus::InProgress) {
            tracing::info!(
                plan_id = %plan_id,
                step = index + 1,
                status = plan.status.as_str(),
                "Discarding step outcome for a plan that stopped running"
            );
            return Ok(false);
        }

        let settled_as = outcome.status();
        plan.commit_step(index, outcome)?;
        self.plans.save(&plan).await?;

        let step = &plan.steps[index];
        match settled_as {
            StepStatus::Failed => tracing::warn!(
                plan_id = %plan_id,
                step = step.serial_number,
                error = step.error.as_deref().unwrap_or_default(),
                "Plan step failed, halting plan"
            ),
            status => tracing::info!(
                plan_id = %plan_id,
                step = step.serial_number,
                status = status.as_str(),
                duration_ms = step.duration_ms,
                "Plan step settled"
            ),
        }
        Ok(plan.status == PlanStatus::Running)
    }

    /// Cancel a plan that has not finished.
    ///
    /// Unsettled steps are marked cancelled at once; a step already in
    /// flight is abandoned and its outcome discarded.
    pub async fn cancel(&self, plan_id: Uuid) -> DomainResult<OrchestrationPlan> {
        let plan = {
            let _guard = self.write_lock.lock().await;
            let mut plan = self.load(plan_id).await?;
            let cancelled_steps = plan.cancel()?;
            self.plans.save(&plan).await?;
            tracing::info!(plan_id = %plan_id, cancelled_steps, "Plan cancelled");
            plan
        };

        if let Some(token) = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&plan_id)
        {
            token.cancel();
        }
        Ok(plan)
    }

    /// Delete a plan that is not running.
    pub async fn delete(&self, plan_id: Uuid) -> DomainResult<()> {
        let _guard = self.write_lock.lock().await;
        let plan = self.load(plan_id).await?;
        if plan.status == PlanStatus::Running {
            return Err(DomainError::InvalidStateTransition {
                from: plan.status.as_str().to_string(),
                to: "deleted".to_string(),
                reason: "cancel the plan before deleting it".to_string(),
            });
        }
        self.plans.delete(plan_id).await?;
        tracing::info!(plan_id = %plan_id, "Plan deleted");
        Ok(())
    }
}
