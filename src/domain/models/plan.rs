//! Orchestration plan domain model.
//!
//! A plan is the Maestro agent's decomposition of a user goal into an
//! ordered list of steps, each assigned to a worker agent step. Plans move
//! through a small state machine; steps have a forward-only lifecycle.
//!
//! ```text
//! Draft ──► PendingApproval ──► Approved ──► Running ──► Completed
//!   │              │               │            ├──────► Failed
//!   └──► Failed    └───────────────┴────────────┴──────► Cancelled
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Agent name the planner uses for a task no known agent can perform.
pub const CAPABILITY_GAP_SENTINEL: &str = "N/A (New Capability Needed)";

/// Whether an assigned agent name marks a capability gap.
///
/// Matches the sentinel itself and any other `N/A...` spelling of it.
pub fn is_capability_gap(agent_name: &str) -> bool {
    let agent = agent_name.trim();
    agent.eq_ignore_ascii_case(CAPABILITY_GAP_SENTINEL)
        || agent.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("n/a"))
}

/// Lifecycle status of an orchestration plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Being drafted by the planner
    Draft,
    /// Parsed successfully, waiting for the user
    PendingApproval,
    /// Approved but not started
    Approved,
    /// Steps are being executed
    Running,
    /// Every step settled without failure
    Completed,
    /// A step failed, or the planner output could not be parsed
    Failed,
    /// Stopped by the user
    Cancelled,
}

impl Default for PlanStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "draft" => Some(Self::Draft),
            "pending_approval" | "pending" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn valid_transitions(&self) -> Vec<Self> {
        match self {
            Self::Draft => vec![Self::PendingApproval, Self::Failed, Self::Cancelled],
            Self::PendingApproval => vec![Self::Approved, Self::Running, Self::Cancelled],
            Self::Approved => vec![Self::Running, Self::Cancelled],
            Self::Running => vec![Self::Completed, Self::Failed, Self::Cancelled],
            Self::Completed | Self::Failed | Self::Cancelled => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }

    /// Terminal plans only leave the store by deletion.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Lifecycle status of a single plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    /// Capability gap; not a failure
    Skipped,
    Cancelled,
}

impl Default for StepStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        matches!(
            (self, new_status),
            (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Cancelled)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
                | (Self::InProgress, Self::Skipped)
                | (Self::InProgress, Self::Cancelled)
        )
    }

    /// A settled step never changes status again.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped | Self::Cancelled)
    }
}

/// What happened when a step was dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed {
        result: String,
        task_record_id: Option<Uuid>,
    },
    Failed {
        error: String,
        result: Option<String>,
        task_record_id: Option<Uuid>,
    },
    Skipped {
        error: String,
        result: String,
    },
}

impl StepOutcome {
    pub fn status(&self) -> StepStatus {
        match self {
            Self::Completed { .. } => StepStatus::Completed,
            Self::Failed { .. } => StepStatus::Failed,
            Self::Skipped { .. } => StepStatus::Skipped,
        }
    }
}

/// One step of a parsed plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationStep {
    pub id: Uuid,
    /// 1-based position in the plan
    pub serial_number: u32,
    pub task_name: String,
    #[serde(default)]
    pub task_description: String,
    #[serde(default)]
    pub assigned_agent_name: String,
    #[serde(default)]
    pub assigned_agent_step_name: String,
    #[serde(default)]
    pub input_summary: String,
    #[serde(default)]
    pub output_summary: String,
    /// Raw Markdown lines the step was parsed from
    #[serde(default)]
    pub original_markdown_lines: Vec<String>,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub result: Option<String>,
    pub error: Option<String>,
    /// Append-only execution log
    #[serde(default)]
    pub logs: Vec<String>,
    pub task_record_id: Option<Uuid>,
}

impl OrchestrationStep {
    pub fn new(serial_number: u32, task_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            serial_number,
            task_name: task_name.into(),
            task_description: String::new(),
            assigned_agent_name: String::new(),
            assigned_agent_step_name: String::new(),
            input_summary: String::new(),
            output_summary: String::new(),
            original_markdown_lines: Vec::new(),
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            result: None,
            error: None,
            logs: Vec::new(),
            task_record_id: None,
        }
    }

    pub fn with_assignment(mut self, agent_name: impl Into<String>, step_name: impl Into<String>) -> Self {
        self.assigned_agent_name = agent_name.into();
        self.assigned_agent_step_name = step_name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.task_description = description.into();
        self
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input_summary = input.into();
        self
    }

    /// Whether the planner flagged this step as needing a new capability.
    pub fn is_capability_gap(&self) -> bool {
        is_capability_gap(&self.assigned_agent_name)
    }

    /// Append a timestamped line to the step log.
    pub fn log(&mut self, message: impl AsRef<str>) {
        self.logs
            .push(format!("[{}] {}", Utc::now().format("%H:%M:%S"), message.as_ref()));
    }

    /// Mark the step in progress.
    ///
    /// A step already in progress (left behind by an interrupted run) is
    /// restarted in place instead of being rejected.
    pub fn start(&mut self) -> DomainResult<()> {
        match self.status {
            StepStatus::Pending => {
                self.log(format!("Starting step {}: {}", self.serial_number, self.task_name));
            }
            StepStatus::InProgress => {
                self.log(format!("Resuming step {}: {}", self.serial_number, self.task_name));
            }
            other => return Err(step_transition_error(other, StepStatus::InProgress, "step already settled")),
        }
        self.status = StepStatus::InProgress;
        self.started_at = Some(Utc::now());
        self.completed_at = None;
        self.duration_ms = None;
        Ok(())
    }

    /// Record the outcome of a dispatch.
    pub fn settle(&mut self, outcome: StepOutcome) -> DomainResult<()> {
        let new_status = outcome.status();
        if !self.status.can_transition_to(new_status) {
            return Err(step_transition_error(self.status, new_status, "step is not in progress"));
        }

        let now = Utc::now();
        self.completed_at = Some(now);
        self.duration_ms = self
            .started_at
            .map(|started| u64::try_from((now - started).num_milliseconds()).unwrap_or(0));
        self.status = new_status;

        match outcome {
            StepOutcome::Completed { result, task_record_id } => {
                self.result = Some(result);
                self.task_record_id = task_record_id;
                self.log("Step completed successfully.");
            }
            StepOutcome::Failed { error, result, task_record_id } => {
                self.log(format!("Step failed: {error}"));
                self.error = Some(error);
                self.result = result;
                self.task_record_id = task_record_id;
            }
            StepOutcome::Skipped { error, result } => {
                self.log(format!("Step skipped: {error}"));
                self.error = Some(error);
                self.result = Some(result);
            }
        }
        Ok(())
    }

    /// Cancel the step if it has not settled. Returns whether it changed.
    pub fn cancel(&mut self) -> bool {
        if self.status.is_settled() {
            return false;
        }
        self.status = StepStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        self.log("Step cancelled by user.");
        true
    }
}

fn step_transition_error(from: StepStatus, to: StepStatus, reason: &str) -> DomainError {
    DomainError::InvalidStateTransition {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
        reason: reason.to_string(),
    }
}

/// Percentage of `numerator / denominator`, rounded, clamped to 0..=100.
fn percent(numerator: f64, denominator: usize) -> u8 {
    if denominator == 0 {
        return 100;
    }
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let value = (numerator / denominator as f64 * 100.0).round().clamp(0.0, 100.0) as u8;
    value
}

/// A Maestro-drafted plan and its execution state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationPlan {
    pub id: Uuid,
    pub user_goal: String,
    /// Unmodified planner output
    pub raw_plan_text: String,
    pub steps: Vec<OrchestrationStep>,
    pub status: PlanStatus,
    /// Index of the next step to run
    pub current_step_index: usize,
    /// 0-100
    pub overall_progress: u8,
    /// Parse-time error
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrchestrationPlan {
    /// Create a draft plan for a goal.
    pub fn new(user_goal: impl Into<String>, raw_plan_text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_goal: user_goal.into(),
            raw_plan_text: raw_plan_text.into(),
            steps: Vec::new(),
            status: PlanStatus::Draft,
            current_step_index: 0,
            overall_progress: 0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A freshly parsed plan waiting for approval.
    pub fn pending_approval(
        user_goal: impl Into<String>,
        raw_plan_text: impl Into<String>,
        steps: Vec<OrchestrationStep>,
    ) -> Self {
        let mut plan = Self::new(user_goal, raw_plan_text);
        plan.steps = steps;
        plan.status = PlanStatus::PendingApproval;
        plan
    }

    /// A plan whose planner output could not be parsed into steps.
    pub fn malformed(
        user_goal: impl Into<String>,
        raw_plan_text: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let mut plan = Self::new(user_goal, raw_plan_text);
        plan.status = PlanStatus::Failed;
        plan.error = Some(error.into());
        plan
    }

    /// Replace the step list. Only allowed while the plan is a draft.
    pub fn set_steps(&mut self, steps: Vec<OrchestrationStep>) -> DomainResult<()> {
        if self.status != PlanStatus::Draft {
            return Err(DomainError::ValidationFailed(format!(
                "Steps of plan {} are frozen once it leaves draft",
                self.id
            )));
        }
        self.steps = steps;
        Ok(())
    }

    pub fn transition_to(&mut self, new_status: PlanStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(new_status) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: new_status.as_str().to_string(),
                reason: format!("plan {} cannot move to {}", self.id, new_status.as_str()),
            });
        }

        match new_status {
            PlanStatus::Running => {
                self.current_step_index = 0;
                self.overall_progress = 0;
            }
            PlanStatus::Completed => self.overall_progress = 100,
            _ => {}
        }
        self.status = new_status;
        self.touch();
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn current_step(&self) -> Option<&OrchestrationStep> {
        self.steps.get(self.current_step_index)
    }

    pub fn settled_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.status.is_settled()).count()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Result of the most recent completed step before `index`.
    pub fn previous_output(&self, index: usize) -> Option<&str> {
        self.steps[..index.min(self.steps.len())]
            .iter()
            .rev()
            .find(|s| s.status == StepStatus::Completed)
            .and_then(|s| s.result.as_deref())
    }

    /// Put the step at the cursor in progress.
    ///
    /// Returns `Ok(None)` and completes the plan when the cursor is past the
    /// last step.
    pub fn begin_current_step(&mut self) -> DomainResult<Option<usize>> {
        if self.status != PlanStatus::Running {
            return Err(DomainError::ExecutionFailed(format!(
                "plan {} is {}, not running",
                self.id,
                self.status.as_str()
            )));
        }

        let index = self.current_step_index;
        if index >= self.steps.len() {
            self.transition_to(PlanStatus::Completed)?;
            return Ok(None);
        }

        self.steps[index].start()?;
        self.overall_progress = percent(index as f64 + 0.5, self.steps.len());
        self.touch();
        Ok(Some(index))
    }

    /// Commit a dispatch outcome for the step at `index`.
    ///
    /// Advances the cursor, recomputes progress, and settles the plan when
    /// the step failed or was the last one.
    pub fn commit_step(&mut self, index: usize, outcome: StepOutcome) -> DomainResult<()> {
        let total = self.steps.len();
        let step = self
            .steps
            .get_mut(index)
            .ok_or_else(|| DomainError::ExecutionFailed(format!("step index {index} out of range")))?;
        let failed = outcome.status() == StepStatus::Failed;
        step.settle(outcome)?;

        self.current_step_index = index + 1;
        #[allow(clippy::cast_precision_loss)]
        let settled = self.settled_steps() as f64;
        self.overall_progress = percent(settled, total);

        if failed {
            let step = &self.steps[index];
            self.error = Some(format!(
                "Step {} ({}) failed: {}",
                step.serial_number,
                step.task_name,
                step.error.as_deref().unwrap_or("unknown error")
            ));
            self.transition_to(PlanStatus::Failed)?;
        } else if self.current_step_index >= total {
            self.transition_to(PlanStatus::Completed)?;
        } else {
            self.touch();
        }
        Ok(())
    }

    /// Cancel the plan and every step that has not settled.
    ///
    /// Returns the number of steps that were cancelled.
    pub fn cancel(&mut self) -> DomainResult<usize> {
        if !self.status.can_transition_to(PlanStatus::Cancelled) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: PlanStatus::Cancelled.as_str().to_string(),
                reason: format!("plan {} has already finished", self.id),
            });
        }
        let cancelled = self.steps.iter_mut().filter_map(|s| s.cancel().then_some(())).count();
        self.transition_to(PlanStatus::Cancelled)?;
        Ok(cancelled)
    }
}
