//! Parser for the Maestro agent's Markdown plans.
//!
//! The planner is asked for a strict format, but model output drifts: headers
//! lose their bold, labels move the colon outside the emphasis, values get
//! wrapped in backticks. The parser works line by line and tolerates those
//! variations. Output it cannot turn into steps is either a malformed plan
//! (it talks about plan steps) or a conversational reply (it does not).

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::models::{OrchestrationPlan, OrchestrationStep};

/// Error stored on a plan whose Markdown yielded no steps.
pub const MALFORMED_PLAN_ERROR: &str = "Failed to parse plan steps from Maestro's output. \
     The format might be incorrect. Check the raw Markdown below.";

const PLAN_MARKER: &str = "plan step";

static STEP_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:>\s*)?(?:[*+\-]\s+|\d+[.)]\s+)?(?P<hash>#{1,6}\s*)?(?P<bold>\*\*)?\s*plan\s+step(?:\s*(?P<num>\d+))?\s*(?:[:.)\-]|\s|$)(?P<name>.*)$",
    )
    .expect("step header pattern is valid")
});

static STEP_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:[*+\-]\s+|\d+[.)]\s+)?(?:\*\*)?\s*(?P<label>task\s+description|assigned\s+agent\s+step|assigned\s+agent|input|output)\s*(?:\*\*\s*:|:\s*(?:\*\*)?)\s*(?P<value>.*?)\s*$",
    )
    .expect("step field pattern is valid")
});

/// Result of parsing planner output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanParseOutcome {
    /// At least one step; plan is pending approval
    Parsed(OrchestrationPlan),
    /// Mentions plan steps but none could be extracted; plan is failed
    Malformed(OrchestrationPlan),
    /// Not a plan at all
    Conversational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    TaskDescription,
    AssignedAgent,
    AssignedAgentStep,
    Input,
    Output,
}

impl Field {
    fn from_label(label: &str) -> Option<Self> {
        let normalized = label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match normalized.as_str() {
            "task description" => Some(Self::TaskDescription),
            "assigned agent" => Some(Self::AssignedAgent),
            "assigned agent step" => Some(Self::AssignedAgentStep),
            "input" => Some(Self::Input),
            "output" => Some(Self::Output),
            _ => None,
        }
    }
}

/// A step header plus the lines under it.
struct Block {
    ordinal: Option<u32>,
    position: u32,
    task_name: String,
    lines: Vec<String>,
}

/// Remove wrapping backticks, quotes and emphasis from a value.
pub fn strip_wrapping(value: &str) -> String {
    let mut current = value.trim();
    loop {
        let stripped = ["**", "`", "\"", "'", "*"].iter().find_map(|wrapper| {
            (current.len() >= wrapper.len() * 2 && current.starts_with(wrapper) && current.ends_with(wrapper))
                .then(|| current[wrapper.len()..current.len() - wrapper.len()].trim())
        });
        match stripped {
            Some(inner) => current = inner,
            None => return current.to_string(),
        }
    }
}

fn header_of(line: &str) -> Option<(Option<u32>, String)> {
    let caps = STEP_HEADER.captures(line)?;
    if caps.name("hash").is_none() && caps.name("bold").is_none() {
        return None;
    }
    let ordinal = caps.name("num").and_then(|m| m.as_str().parse().ok());
    let raw_name = caps.name("name").map_or("", |m| m.as_str());
    // Anything after the closing emphasis is commentary, not the name.
    let opened = raw_name.trim().trim_start_matches('*').trim_start();
    let name = opened.split("**").next().unwrap_or(opened).trim().trim_matches('*').trim();
    Some((ordinal, strip_wrapping(name)))
}

fn split_blocks(raw_text: &str) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut position = 0;

    for line in raw_text.lines() {
        if let Some((ordinal, task_name)) = header_of(line) {
            position += 1;
            blocks.push(Block {
                ordinal,
                position,
                task_name,
                lines: vec![line.trim().to_string()],
            });
            continue;
        }
        let trimmed = line.trim();
        if let (Some(block), false) = (blocks.last_mut(), trimmed.is_empty()) {
            block.lines.push(trimmed.to_string());
        }
    }
    blocks
}

fn step_from_block(block: Block) -> Option<OrchestrationStep> {
    if block.task_name.is_empty() {
        tracing::warn!(position = block.position, "Discarding plan step block without a task name");
        return None;
    }

    let mut step = OrchestrationStep::new(block.ordinal.unwrap_or(block.position), block.task_name);
    for line in &block.lines[1..] {
        let Some(caps) = STEP_FIELD.captures(line) else {
            continue;
        };
        let Some(field) = Field::from_label(&caps["label"]) else {
            continue;
        };
        let value = strip_wrapping(&caps["value"]);
        match field {
            Field::TaskDescription => step.task_description = value,
            Field::AssignedAgent => step.assigned_agent_name = value,
            Field::AssignedAgentStep => step.assigned_agent_step_name = value,
            Field::Input => step.input_summary = value,
            Field::Output => step.output_summary = value,
        }
    }
    step.original_markdown_lines = block.lines;
    Some(step)
}

/// Extract the steps of a Markdown plan, ordered by serial number.
///
/// Planner ordinals only decide the order. Serials are reassigned `1..=n`
/// afterwards, so repeated, zero or missing ordinals still yield a strictly
/// increasing sequence.
pub fn extract_steps(raw_text: &str) -> Vec<OrchestrationStep> {
    let mut steps: Vec<_> = split_blocks(raw_text).into_iter().filter_map(step_from_block).collect();
    steps.sort_by_key(|s| s.serial_number);
    for (serial, step) in (1..).zip(steps.iter_mut()) {
        step.serial_number = serial;
    }
    steps
}

/// Parse planner output into a plan for `user_goal`.
pub fn parse_plan(raw_text: &str, user_goal: &str) -> PlanParseOutcome {
    let steps = extract_steps(raw_text);
    if !steps.is_empty() {
        tracing::debug!(steps = steps.len(), "Parsed orchestration plan");
        return PlanParseOutcome::Parsed(OrchestrationPlan::pending_approval(user_goal, raw_text, steps));
    }

    if raw_text.to_lowercase().contains(PLAN_MARKER) {
        tracing::warn!("Planner output mentions plan steps but none could be parsed");
        return PlanParseOutcome::Malformed(OrchestrationPlan::malformed(user_goal, raw_text, MALFORMED_PLAN_ERROR));
    }

    PlanParseOutcome::Conversational
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{PlanStatus, StepStatus, CAPABILITY_GAP_SENTINEL};

    const CANONICAL: &str = "\
## Blog Launch Plan
**User Goal:** Write a blog post about tea

---
**Plan Step 1: Keyword Research**
*   **Task Description:** Find keywords for tea.
*   **Assigned Agent:** `Keyword Researcher Agent`
*   **Assigned Agent Step:** `Generate Keywords`
*   **Input:** The topic \"tea\"
*   **Output:** A keyword list
---
**Plan Step 2: Write Draft**
*   **Task Description:** Write the post.
*   **Assigned Agent:** `Content Writer Agent`
*   **Assigned Agent Step:** `Write Content Piece`
*   **Input:** Output from Plan Step 1
*   **Output:** A blog post
---
";

    fn parsed(raw: &str) -> OrchestrationPlan {
        match parse_plan(raw, "goal") {
            PlanParseOutcome::Parsed(plan) => plan,
            other => panic!("expected a parsed plan, got {other:?}"),
        }
    }

    #[test]
    fn test_parses_canonical_plan() {
        let plan = parsed(CANONICAL);
        assert_eq!(plan.status, PlanStatus::PendingApproval);
        assert_eq!(plan.raw_plan_text, CANONICAL);
        assert_eq!(plan.steps.len(), 2);

        let first = &plan.steps[0];
        assert_eq!(first.serial_number, 1);
        assert_eq!(first.task_name, "Keyword Research");
        assert_eq!(first.task_description, "Find keywords for tea.");
        assert_eq!(first.assigned_agent_name, "Keyword Researcher Agent");
        assert_eq!(first.assigned_agent_step_name, "Generate Keywords");
        assert_eq!(first.input_summary, "The topic \"tea\"");
        assert_eq!(first.output_summary, "A keyword list");
        assert_eq!(first.status, StepStatus::Pending);
        assert!(first.original_markdown_lines.contains(&"---".to_string()));

        assert_eq!(plan.steps[1].input_summary, "Output from Plan Step 1");
    }

    #[test]
    fn test_tolerates_format_drift() {
        let raw = "\
### Plan Step 1: Research
- **Task Description**: Look things up
- Assigned Agent: Researcher
- **Assigned Agent Step:** \"Search\"

**Plan Step 2:** Summarize
* **Assigned Agent:** **Writer**
* **Assigned Agent Step:** Summary
";
        let plan = parsed(raw);
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].task_name, "Research");
        assert_eq!(plan.steps[0].task_description, "Look things up");
        assert_eq!(plan.steps[0].assigned_agent_name, "Researcher");
        assert_eq!(plan.steps[0].assigned_agent_step_name, "Search");
        assert_eq!(plan.steps[1].task_name, "Summarize");
        assert_eq!(plan.steps[1].assigned_agent_name, "Writer");
    }

    #[test]
    fn test_sorts_by_ordinal() {
        let raw = "**Plan Step 3: C**\n**Plan Step 1: A**\n**Plan Step 2: B**\n";
        let names: Vec<_> = parsed(raw).steps.into_iter().map(|s| s.task_name).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_missing_ordinal_uses_position() {
        let raw = "**Plan Step: First**\n**Plan Step: Second**\n";
        let plan = parsed(raw);
        assert_eq!(plan.steps[0].serial_number, 1);
        assert_eq!(plan.steps[1].serial_number, 2);
    }

    #[test]
    fn test_repeated_and_zero_ordinals_are_renumbered() {
        let raw = "**Plan Step 1: A**\n**Plan Step 1: B**\n**Plan Step: C**\n**Plan Step 0: Z**\n";
        let serials: Vec<_> = parsed(raw)
            .steps
            .into_iter()
            .map(|s| (s.serial_number, s.task_name))
            .collect();
        assert_eq!(
            serials,
            vec![(1, "Z".to_string()), (2, "A".to_string()), (3, "B".to_string()), (4, "C".to_string())]
        );
    }

    #[test]
    fn test_gapped_ordinals_are_compacted() {
        let raw = "**Plan Step 7: Later**\n**Plan Step 3: Sooner**\n";
        let plan = parsed(raw);
        assert_eq!(plan.steps[0].serial_number, 1);
        assert_eq!(plan.steps[0].task_name, "Sooner");
        assert_eq!(plan.steps[1].serial_number, 2);
        assert_eq!(plan.steps[1].task_name, "Later");
    }

    #[test]
    fn test_header_name_stops_at_closing_emphasis() {
        assert_eq!(header_of("**Plan Step 1: Research** (est. 5m)").map(|(_, n)| n).as_deref(), Some("Research"));
        assert_eq!(header_of("## Plan Step 2: **Draft** now").map(|(_, n)| n).as_deref(), Some("Draft"));
        assert_eq!(header_of("**Plan Step 3:** Review").map(|(_, n)| n).as_deref(), Some("Review"));
        assert_eq!(header_of("### Plan Step 4: Publish").map(|(_, n)| n).as_deref(), Some("Publish"));
    }

    #[test]
    fn test_discards_blocks_without_name() {
        let raw = "**Plan Step 1:**\n* **Input:** x\n**Plan Step 2: Real**\n";
        let plan = parsed(raw);
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].task_name, "Real");
    }

    #[test]
    fn test_capability_gap_sentinel_survives() {
        let raw = "**Plan Step 1: Translate**\n*   **Assigned Agent:** `N/A (New Capability Needed)`\n*   **Assigned Agent Step:** `N/A`\n";
        let plan = parsed(raw);
        assert_eq!(plan.steps[0].assigned_agent_name, CAPABILITY_GAP_SENTINEL);
        assert!(plan.steps[0].is_capability_gap());
    }

    #[test]
    fn test_malformed_when_marker_without_steps() {
        let raw = "Here is my plan step overview, but I forgot the format.";
        match parse_plan(raw, "goal") {
            PlanParseOutcome::Malformed(plan) => {
                assert_eq!(plan.status, PlanStatus::Failed);
                assert_eq!(plan.error.as_deref(), Some(MALFORMED_PLAN_ERROR));
                assert_eq!(plan.raw_plan_text, raw);
                assert!(plan.steps.is_empty());
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_conversational_without_marker() {
        assert_eq!(
            parse_plan("Hello! How can I help you today?", "goal"),
            PlanParseOutcome::Conversational
        );
        assert_eq!(parse_plan("", "goal"), PlanParseOutcome::Conversational);
    }

    #[test]
    fn test_prose_mentioning_plan_steps_is_not_a_header() {
        assert!(header_of("Plan step 1 is to research.").is_none());
        assert!(header_of("**Plan Steps**").is_none());
        assert!(header_of("**Plan Step 4: Publish**").is_some());
    }

    #[test]
    fn test_strip_wrapping() {
        assert_eq!(strip_wrapping("`name`"), "name");
        assert_eq!(strip_wrapping(" **`name`** "), "name");
        assert_eq!(strip_wrapping("\"quoted\""), "quoted");
        assert_eq!(strip_wrapping("plain `inner` text"), "plain `inner` text");
        assert_eq!(strip_wrapping("`"), "`");
    }
}
