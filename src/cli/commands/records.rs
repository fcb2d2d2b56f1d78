//! Task execution record commands.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::context::AppContext;
use crate::cli::display::{colorize_status, list_table, render_list};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{Config, TaskExecutionRecord};
use crate::domain::ports::TaskRecorder;

#[derive(Args, Debug)]
pub struct RecordsArgs {
    #[command(subcommand)]
    pub command: RecordsCommands,
}

#[derive(Subcommand, Debug)]
pub enum RecordsCommands {
    /// List worker and Maestro calls, newest first
    List {
        /// Only records for this agent id
        #[arg(long)]
        agent: Option<String>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct RecordListOutput {
    pub records: Vec<TaskExecutionRecord>,
    pub total: usize,
}

impl CommandOutput for RecordListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["started", "agent", "step", "status", "duration", "tokens in/out"]);
        for record in &self.records {
            table.add_row(vec![
                record.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                truncate(&record.agent_name, 24),
                truncate(&record.step_name, 24),
                colorize_status(record.status.as_str()).to_string(),
                record
                    .duration_ms
                    .map(|ms| format!("{:.1}s", ms as f64 / 1000.0))
                    .unwrap_or_else(|| "-".to_string()),
                format!("{}/{}", record.approx_input_tokens, record.approx_output_tokens),
            ]);
        }
        let mut text = render_list("record", &table, self.records.len());
        if self.total > self.records.len() {
            text.push_str(&format!("\nShowing {} of {}", self.records.len(), self.total));
        }
        text
    }
}

pub async fn execute(args: RecordsArgs, config: Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;

    match args.command {
        RecordsCommands::List { agent, limit } => {
            let mut records = ctx.recorder.list(agent.as_deref()).await?;
            let total = records.len();
            records.truncate(limit);
            output(&RecordListOutput { records, total }, json_mode);
        }
    }

    Ok(())
}
