//! Command-line interface.

pub mod commands;
pub mod context;
pub mod display;
pub mod output;

use clap::{Parser, Subcommand};

use commands::agent::AgentArgs;
use commands::chat::{ChatArgs, PromptArgs};
use commands::init::InitArgs;
use commands::plan::PlanArgs;
use commands::records::RecordsArgs;

#[derive(Parser, Debug)]
#[command(name = "maestro")]
#[command(about = "Maestro - plan and run multi-step work across LLM worker agents", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Log at debug level regardless of configuration
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the project directory, configuration and database
    Init(InitArgs),
    /// Manage the agent catalogue
    Agent(AgentArgs),
    /// Draft, approve and run orchestration plans
    Plan(PlanArgs),
    /// Chat with the Maestro agent
    Chat(ChatArgs),
    /// Send a free-form prompt to the Maestro agent
    Prompt(PromptArgs),
    /// Inspect generation call records
    Records(RecordsArgs),
}

/// Print a command error and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "caused_by": chain,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{}", display::action_failure(&format!("Error: {err}")));
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
    }
    std::process::exit(1);
}
