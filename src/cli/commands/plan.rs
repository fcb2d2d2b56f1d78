//! Orchestration plan CLI commands.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};
use indicatif::ProgressBar;
use uuid::Uuid;

use crate::cli::context::{AppContext, SqlitePlanEngine};
use crate::cli::display::{
    action_failure, action_success, colorize_status, label, list_table, render_list, spinner, step_progress,
};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{Config, OrchestrationPlan, PlanStatus};
use crate::domain::ports::{PlanFilter, PlanRepository, DEFAULT_PLANS_PER_PAGE};
use crate::services::DraftOutcome;

const PROGRESS_POLL: Duration = Duration::from_millis(250);

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(subcommand)]
    pub command: PlanCommands,
}

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Ask the Maestro agent to draft a plan for a goal
    Draft {
        /// What you want to achieve
        goal: String,
    },
    /// Approve a plan that is pending approval
    Approve {
        id: String,
        /// Start executing right after approval
        #[arg(long)]
        run: bool,
    },
    /// Execute an approved plan
    Run { id: String },
    /// Continue a running plan that was interrupted
    Resume { id: String },
    /// Cancel a plan that has not finished
    Cancel { id: String },
    /// List plans, newest first
    List {
        /// Filter by status (e.g. running, completed)
        #[arg(short, long)]
        status: Option<String>,
        /// Case-insensitive substring of the goal
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value = "1")]
        page: usize,
        #[arg(long, default_value_t = DEFAULT_PLANS_PER_PAGE)]
        per_page: usize,
    },
    /// Show a plan and its steps
    Show { id: String },
    /// Delete a plan that is not running
    Delete { id: String },
}

#[derive(Debug, serde::Serialize)]
pub struct PlanSummaryOutput {
    pub id: String,
    pub user_goal: String,
    pub status: String,
    pub steps: usize,
    pub overall_progress: u8,
    pub created_at: String,
}

impl From<&OrchestrationPlan> for PlanSummaryOutput {
    fn from(plan: &OrchestrationPlan) -> Self {
        Self {
            id: plan.id.to_string(),
            user_goal: plan.user_goal.clone(),
            status: plan.status.as_str().to_string(),
            steps: plan.steps.len(),
            overall_progress: plan.overall_progress,
            created_at: plan.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct PlanListOutput {
    pub plans: Vec<PlanSummaryOutput>,
    pub total: u64,
    pub page: usize,
    pub per_page: usize,
}

impl CommandOutput for PlanListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "status", "progress", "steps", "created", "goal"]);
        for plan in &self.plans {
            table.add_row(vec![
                plan.id[..8].to_string(),
                colorize_status(&plan.status).to_string(),
                format!("{}%", plan.overall_progress),
                plan.steps.to_string(),
                plan.created_at.clone(),
                truncate(&plan.user_goal, 50),
            ]);
        }
        let total = usize::try_from(self.total).unwrap_or(usize::MAX);
        let mut text = render_list("plan", &table, total);
        let pages = total.div_ceil(self.per_page.max(1));
        if pages > 1 {
            text.push_str(&format!("\nPage {} of {pages}", self.page));
        }
        text
    }
}

#[derive(Debug, serde::Serialize)]
pub struct PlanDetailOutput {
    #[serde(flatten)]
    pub plan: OrchestrationPlan,
}

impl CommandOutput for PlanDetailOutput {
    fn to_human(&self) -> String {
        let plan = &self.plan;
        let mut lines = vec![
            format!("{} {}", label("Plan:"), plan.id),
            format!("{} {}", label("Goal:"), plan.user_goal),
            format!("{} {}", label("Status:"), colorize_status(plan.status.as_str())),
            format!("{} {}%", label("Progress:"), plan.overall_progress),
            format!("{} {}", label("Created:"), plan.created_at.format("%Y-%m-%d %H:%M:%S")),
        ];
        if let Some(error) = &plan.error {
            lines.push(format!("{} {error}", label("Error:")));
        }

        if plan.steps.is_empty() {
            lines.push(format!("\n{}\n{}", label("Raw plan text:"), plan.raw_plan_text));
            return lines.join("\n");
        }

        lines.push(format!("\n{} ({}):", label("Steps"), plan.steps.len()));
        for step in &plan.steps {
            let marker = if plan.status == PlanStatus::Running && plan.current_step_index + 1 == step.serial_number as usize {
                ">"
            } else {
                " "
            };
            lines.push(format!(
                "{marker} {}. {} [{}]",
                step.serial_number,
                step.task_name,
                colorize_status(step.status.as_str())
            ));
            lines.push(format!(
                "     {} {} / {}",
                label("Agent:"),
                step.assigned_agent_name,
                step.assigned_agent_step_name
            ));
            if !step.input_summary.is_empty() {
                lines.push(format!("     {} {}", label("Input:"), truncate(&step.input_summary, 100)));
            }
            if let Some(ms) = step.duration_ms {
                lines.push(format!("     {} {:.1}s", label("Duration:"), ms as f64 / 1000.0));
            }
            if let Some(result) = &step.result {
                lines.push(format!("     {} {}", label("Result:"), truncate(&result.replace('\n', " "), 200)));
            }
            if let Some(error) = &step.error {
                lines.push(format!("     {} {error}", label("Error:")));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct DraftOutput {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<OrchestrationPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl From<DraftOutcome> for DraftOutput {
    fn from(outcome: DraftOutcome) -> Self {
        match outcome {
            DraftOutcome::Plan(plan) => Self { outcome: "plan", plan: Some(plan), text: None },
            DraftOutcome::Malformed(plan) => Self { outcome: "malformed", plan: Some(plan), text: None },
            DraftOutcome::Conversational { text } => Self { outcome: "conversational", plan: None, text: Some(text) },
        }
    }
}

impl CommandOutput for DraftOutput {
    fn to_human(&self) -> String {
        match (&self.plan, &self.text) {
            (Some(plan), _) if self.outcome == "plan" => format!(
                "{}\n\n{}\n\nApprove with: maestro plan approve {} --run",
                action_success("Plan drafted and awaiting approval"),
                PlanDetailOutput { plan: plan.clone() }.to_human(),
                plan.id
            ),
            (Some(plan), _) => format!(
                "{}\n\n{}",
                action_failure(&format!("The Maestro's plan could not be parsed (saved as {})", plan.id)),
                plan.raw_plan_text
            ),
            (None, Some(text)) => text.clone(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct PlanActionOutput {
    pub success: bool,
    pub message: String,
    pub plan_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl CommandOutput for PlanActionOutput {
    fn to_human(&self) -> String {
        if self.success {
            action_success(&self.message)
        } else {
            action_failure(&self.message)
        }
    }
}

/// Resolve a full plan id, or a unique prefix of one.
async fn resolve_plan_id(plans: &impl PlanRepository, input: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(input) {
        return Ok(id);
    }
    let prefix = input.to_lowercase();
    if prefix.len() < 4 || !prefix.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        bail!("Invalid plan id: {input}");
    }

    let filter = PlanFilter { per_page: usize::MAX, ..Default::default() };
    let matches: Vec<Uuid> = plans
        .list(&filter)
        .await?
        .into_iter()
        .map(|p| p.id)
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("Plan not found: {input}"),
        _ => bail!("Plan id prefix '{input}' is ambiguous ({} matches)", matches.len()),
    }
}

enum Drive {
    Run,
    Resume,
}

/// Execute a plan in the foreground, showing step progress.
///
/// Ctrl-C cancels the plan; the in-flight step is abandoned.
async fn drive(engine: Arc<SqlitePlanEngine>, plan_id: Uuid, mode: Drive, json_mode: bool) -> Result<OrchestrationPlan> {
    let initial = engine.get(plan_id).await?;
    let progress = step_progress(initial.total_steps() as u64, json_mode);

    let task_engine = Arc::clone(&engine);
    let mut handle = tokio::spawn(async move {
        match mode {
            Drive::Run => task_engine.run(plan_id).await,
            Drive::Resume => task_engine.resume(plan_id).await,
        }
    });
    let mut ticker = tokio::time::interval(PROGRESS_POLL);
    let mut interrupted = false;

    let result = loop {
        tokio::select! {
            joined = &mut handle => break joined.map_err(|e| anyhow!("Plan task failed: {e}"))?,
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                progress.set_message("cancelling...");
                if let Err(e) = engine.cancel(plan_id).await {
                    tracing::warn!(plan_id = %plan_id, error = %e, "Failed to cancel plan on interrupt");
                }
            }
            _ = ticker.tick() => update_progress(&progress, &engine, plan_id).await,
        }
    };

    let plan = result?;
    progress.set_position(plan.settled_steps() as u64);
    progress.finish_and_clear();
    Ok(plan)
}

async fn update_progress(progress: &ProgressBar, engine: &SqlitePlanEngine, plan_id: Uuid) {
    if let Ok(plan) = engine.get(plan_id).await {
        progress.set_position(plan.settled_steps() as u64);
        if let Some(step) = plan.current_step() {
            progress.set_message(truncate(&step.task_name, 40));
        }
    }
}

fn finished_output(plan: &OrchestrationPlan) -> PlanActionOutput {
    let message = match plan.status {
        PlanStatus::Completed => format!("Plan completed ({} steps)", plan.total_steps()),
        PlanStatus::Failed => format!(
            "Plan failed: {}",
            plan.error.as_deref().unwrap_or("a step failed")
        ),
        PlanStatus::Cancelled => format!("Plan cancelled at {}%", plan.overall_progress),
        status => format!("Plan stopped while {}", status.as_str()),
    };
    PlanActionOutput {
        success: plan.status == PlanStatus::Completed,
        message,
        plan_id: plan.id.to_string(),
        status: Some(plan.status.as_str().to_string()),
    }
}

pub async fn execute(args: PlanArgs, config: Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;

    match args.command {
        PlanCommands::Draft { goal } => {
            let planner = ctx.planner();
            let pb = spinner("Asking the Maestro for a plan...", json_mode);
            let outcome = planner.draft_plan(&goal).await;
            pb.finish_and_clear();
            output(&DraftOutput::from(outcome?), json_mode);
        }

        PlanCommands::Approve { id, run } => {
            let plan_id = resolve_plan_id(ctx.plans.as_ref(), &id).await?;
            let engine = ctx.engine();
            let plan = engine.approve(plan_id).await?;
            if run {
                let plan = drive(engine, plan_id, Drive::Run, json_mode).await?;
                output(&finished_output(&plan), json_mode);
            } else {
                let out = PlanActionOutput {
                    success: true,
                    message: format!("Plan approved: {plan_id}"),
                    plan_id: plan_id.to_string(),
                    status: Some(plan.status.as_str().to_string()),
                };
                output(&out, json_mode);
            }
        }

        PlanCommands::Run { id } => {
            let plan_id = resolve_plan_id(ctx.plans.as_ref(), &id).await?;
            let plan = drive(ctx.engine(), plan_id, Drive::Run, json_mode).await?;
            output(&finished_output(&plan), json_mode);
        }

        PlanCommands::Resume { id } => {
            let plan_id = resolve_plan_id(ctx.plans.as_ref(), &id).await?;
            let plan = drive(ctx.engine(), plan_id, Drive::Resume, json_mode).await?;
            output(&finished_output(&plan), json_mode);
        }

        PlanCommands::Cancel { id } => {
            let plan_id = resolve_plan_id(ctx.plans.as_ref(), &id).await?;
            let plan = ctx.engine().cancel(plan_id).await?;
            let out = PlanActionOutput {
                success: true,
                message: format!("Plan cancelled: {plan_id}"),
                plan_id: plan_id.to_string(),
                status: Some(plan.status.as_str().to_string()),
            };
            output(&out, json_mode);
        }

        PlanCommands::List { status, search, page, per_page } => {
            let status = status
                .map(|s| PlanStatus::from_str(&s).with_context(|| format!("Unknown plan status: {s}")))
                .transpose()?;
            let filter = PlanFilter {
                status,
                search,
                page: page.max(1),
                per_page: per_page.max(1),
            };
            let plans = ctx.plans.list(&filter).await?;
            let total = ctx.plans.count(&filter).await?;
            let out = PlanListOutput {
                plans: plans.iter().map(PlanSummaryOutput::from).collect(),
                total,
                page: filter.page,
                per_page: filter.per_page,
            };
            output(&out, json_mode);
        }

        PlanCommands::Show { id } => {
            let plan_id = resolve_plan_id(ctx.plans.as_ref(), &id).await?;
            let plan = ctx.engine().get(plan_id).await?;
            output(&PlanDetailOutput { plan }, json_mode);
        }

        PlanCommands::Delete { id } => {
            let plan_id = resolve_plan_id(ctx.plans.as_ref(), &id).await?;
            ctx.engine().delete(plan_id).await?;
            let out = PlanActionOutput {
                success: true,
                message: format!("Plan deleted: {plan_id}"),
                plan_id: plan_id.to_string(),
                status: None,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPlanRepository;

    #[tokio::test]
    async fn test_resolve_plan_id_by_prefix() {
        let repo = InMemoryPlanRepository::new();
        let plan = OrchestrationPlan::new("goal", "raw");
        repo.save(&plan).await.unwrap();

        let full = plan.id.to_string();
        assert_eq!(resolve_plan_id(&repo, &full).await.unwrap(), plan.id);
        assert_eq!(resolve_plan_id(&repo, &full[..8]).await.unwrap(), plan.id);
        assert!(resolve_plan_id(&repo, "abc").await.is_err());
        assert!(resolve_plan_id(&repo, "not-an-id").await.is_err());
    }

    #[test]
    fn test_finished_output_reports_failure() {
        let mut plan = OrchestrationPlan::new("goal", "raw");
        plan.status = PlanStatus::Failed;
        plan.error = Some("Step 2 failed".into());
        let out = finished_output(&plan);
        assert!(!out.success);
        assert_eq!(out.message, "Plan failed: Step 2 failed");
        assert_eq!(out.status.as_deref(), Some("failed"));
    }
}
