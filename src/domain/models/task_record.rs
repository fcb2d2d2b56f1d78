//! Task execution record domain model.
//!
//! Every language-model call made on behalf of an agent step leaves one
//! record behind, used for analytics and for linking plan steps to the call
//! that produced their result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const INPUT_SUMMARY_CHARS: usize = 150;
const PROMPT_SNIPPET_CHARS: usize = 100;
const OUTPUT_SUMMARY_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskRecordStatus {
    InProgress,
    Completed,
    Failed,
}

impl TaskRecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Truncate to at most `max` characters, appending `...` when cut.
pub fn summarize(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str("...");
    out
}

/// Rough token estimate: whitespace-separated word count.
pub fn approx_tokens(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

/// Analytics record for one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskExecutionRecord {
    pub id: Uuid,
    pub agent_id: String,
    pub agent_name: String,
    pub step_id: String,
    pub step_name: String,
    pub plan_id: Option<Uuid>,
    pub status: TaskRecordStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub input_summary: String,
    pub output_summary: Option<String>,
    pub error: Option<String>,
    pub approx_input_tokens: u32,
    pub approx_output_tokens: u32,
}

impl TaskExecutionRecord {
    /// Start a record for a call with the given input and prompt.
    pub fn start(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        step_id: impl Into<String>,
        step_name: impl Into<String>,
        input: &str,
        prompt: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            step_id: step_id.into(),
            step_name: step_name.into(),
            plan_id: None,
            status: TaskRecordStatus::InProgress,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            input_summary: format!(
                "{} | Prompt: {}",
                summarize(input, INPUT_SUMMARY_CHARS),
                summarize(prompt, PROMPT_SNIPPET_CHARS)
            ),
            output_summary: None,
            error: None,
            approx_input_tokens: approx_tokens(prompt),
            approx_output_tokens: 0,
        }
    }

    pub fn with_plan(mut self, plan_id: Uuid) -> Self {
        self.plan_id = Some(plan_id);
        self
    }

    fn finish(&mut self, status: TaskRecordStatus) {
        let now = Utc::now();
        self.status = status;
        self.completed_at = Some(now);
        self.duration_ms = Some(u64::try_from((now - self.started_at).num_milliseconds()).unwrap_or(0));
    }

    pub fn complete(mut self, output: &str) -> Self {
        self.finish(TaskRecordStatus::Completed);
        self.output_summary = Some(summarize(output, OUTPUT_SUMMARY_CHARS));
        self.approx_output_tokens = approx_tokens(output);
        self
    }

    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.finish(TaskRecordStatus::Failed);
        self.error = Some(error.into());
        self
    }
}
