//! Conversational access to the Maestro agent.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::context::AppContext;
use crate::cli::display::{label, spinner};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::PROJECT_DIR;
use crate::services::{ChatReply, ChatTurn};

const HISTORY_FILE: &str = "chat_history.json";
/// Turns kept on disk; the planner forwards fewer.
const MAX_STORED_TURNS: usize = 50;

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Message for the Maestro
    pub message: String,
    /// Forget the stored conversation before sending
    #[arg(long)]
    pub reset: bool,
    /// Send the message without earlier turns and do not store it
    #[arg(long)]
    pub no_history: bool,
}

#[derive(Args, Debug)]
pub struct PromptArgs {
    /// Free-form prompt, answered with the worker catalogue in context
    pub text: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ChatOutput {
    #[serde(flatten)]
    pub reply: ChatReply,
}

impl CommandOutput for ChatOutput {
    fn to_human(&self) -> String {
        let mut text = format!("{}\n{}", label("Maestro:"), self.reply.text);
        if self.reply.is_agent_design {
            text.push_str(
                "\n\nThis reply contains an agent design. Save it as JSON and load it with 'maestro agent import <file>'.",
            );
        }
        text
    }
}

#[derive(Debug, serde::Serialize)]
pub struct PromptOutput {
    pub response: String,
}

impl CommandOutput for PromptOutput {
    fn to_human(&self) -> String {
        self.response.clone()
    }
}

pub fn history_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join(HISTORY_FILE)
}

pub fn load_history(path: &Path) -> Result<Vec<ChatTurn>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    match serde_json::from_str(&contents) {
        Ok(turns) => Ok(turns),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable chat history");
            Ok(Vec::new())
        }
    }
}

pub fn save_history(path: &Path, turns: &[ChatTurn]) -> Result<()> {
    let skip = turns.len().saturating_sub(MAX_STORED_TURNS);
    let json = serde_json::to_string_pretty(&turns[skip..])?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub async fn execute(args: ChatArgs, config: Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let path = history_path(Path::new("."));

    if args.reset && path.exists() {
        std::fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    let mut history = if args.no_history { Vec::new() } else { load_history(&path)? };

    let pb = spinner("The Maestro is thinking...", json_mode);
    let reply = ctx.planner().chat(&history, &args.message).await;
    pb.finish_and_clear();
    let reply = reply?;

    if !args.no_history {
        history.push(ChatTurn::user(args.message.trim()));
        history.push(ChatTurn::maestro(reply.text.clone()));
        save_history(&path, &history)?;
    }

    output(&ChatOutput { reply }, json_mode);
    Ok(())
}

pub async fn execute_prompt(args: PromptArgs, config: Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let pb = spinner("Sending prompt to the Maestro...", json_mode);
    let response = ctx.planner().advanced_prompt(&args.text).await;
    pb.finish_and_clear();
    output(&PromptOutput { response: response? }, json_mode);
    Ok(())
}
