//! Terminal styling shared by command output: tables, status colors and
//! progress indicators.

use std::time::Duration;

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use console::{style, StyledObject};
use indicatif::{ProgressBar, ProgressStyle};

const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} [{elapsed}]";
const STEP_PROGRESS_TEMPLATE: &str = "{bar:30.cyan/blue} {pos}/{len} steps {msg}";

/// Create a standard list table with the given headers.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Render the table with a count line, or a "none found" message.
pub fn render_list(entity_name: &str, table: &Table, total: usize) -> String {
    if total == 0 {
        return format!("No {entity_name}s found.");
    }
    let noun = if total == 1 { entity_name.to_string() } else { format!("{entity_name}s") };
    format!("{} {noun}:\n{table}", style(total).bold())
}

/// Color a plan, step or record status.
pub fn colorize_status(status: &str) -> StyledObject<&str> {
    match status {
        "completed" => style(status).green().bold(),
        "running" | "in_progress" => style(status).yellow(),
        "approved" => style(status).cyan(),
        "pending" | "pending_approval" | "draft" => style(status).blue(),
        "failed" => style(status).red().bold(),
        "skipped" | "cancelled" => style(status).dim(),
        _ => style(status),
    }
}

/// Bold label for detail views.
pub fn label(text: &str) -> StyledObject<&str> {
    style(text).bold()
}

pub fn action_success(message: &str) -> String {
    format!("{} {message}", style("\u{2713}").green().bold())
}

pub fn action_failure(message: &str) -> String {
    format!("{} {message}", style("\u{2717}").red().bold())
}

/// Spinner on stderr; hidden in JSON mode.
pub fn spinner(message: impl Into<String>, json_mode: bool) -> ProgressBar {
    if json_mode {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
        pb.set_style(spinner_style);
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Step progress bar on stderr; hidden in JSON mode.
pub fn step_progress(total_steps: u64, json_mode: bool) -> ProgressBar {
    if json_mode {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total_steps);
    if let Ok(bar_style) = ProgressStyle::default_bar().template(STEP_PROGRESS_TEMPLATE) {
        pb.set_style(bar_style.progress_chars("=> "));
    }
    pb
}
