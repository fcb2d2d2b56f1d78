//! Planner behavior through the public service API.

mod common;

use common::harness;
use maestro::adapters::generation::{MockGenerationClient, MockReply};
use maestro::domain::models::{PlanStatus, MAESTRO_AGENT_ID};
use maestro::domain::ports::{PlanFilter, PlanRepository, TaskRecorder};
use maestro::services::{ChatTurn, DraftOutcome};

#[tokio::test]
async fn test_conversational_reply_creates_no_plan() {
    let reply = "Sure, here are three agent ideas for your use case...";
    let h = harness(MockGenerationClient::new().with_default(MockReply::text(reply))).await;

    let outcome = h.planner().draft_plan("Help me with my shop").await.unwrap();

    assert_eq!(outcome, DraftOutcome::Conversational { text: reply.to_string() });
    assert_eq!(h.plans.count(&PlanFilter::default()).await.unwrap(), 0);
    // The Maestro call itself is still recorded.
    let records = h.recorder.list(Some(MAESTRO_AGENT_ID)).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_malformed_plan_is_kept_for_inspection() {
    let raw = "Plan Step one would be research, then Plan Step two writing.";
    let h = harness(MockGenerationClient::new().with_default(MockReply::text(raw))).await;

    let DraftOutcome::Malformed(plan) = h.planner().draft_plan("Write a post").await.unwrap() else {
        panic!("expected a malformed plan");
    };

    let stored = h.plan(plan.id).await;
    assert_eq!(stored.status, PlanStatus::Failed);
    assert_eq!(stored.raw_plan_text, raw);
    assert!(stored.steps.is_empty());
    assert!(h.engine.run(plan.id).await.is_err(), "failed plans cannot run");
}

#[tokio::test]
async fn test_planner_sees_registered_workers() {
    let h = harness(MockGenerationClient::new().with_default(MockReply::text("No plan needed."))).await;

    h.planner().draft_plan("Summarize my notes").await.unwrap();

    let calls = h.client.calls().await;
    assert_eq!(calls.len(), 1);
    assert!(calls[0].prompt.contains(common::WORKER));
    assert!(calls[0].prompt.contains("Step E"));
    assert_eq!(calls[0].agent_id.as_deref(), Some(MAESTRO_AGENT_ID));
}

#[tokio::test]
async fn test_chat_conversation_flow() {
    let design = "### New Agent Design\n**Agent Name:** Tagger\n**Steps:**\n1. **Instruction:** Tag {{input}}";
    let h = harness(MockGenerationClient::new()).await;
    h.client.queue_reply(MockReply::text("What kind of agent do you need?")).await;
    h.client.queue_reply(MockReply::text(design)).await;
    let planner = h.planner();

    let first = planner.chat(&[], "Can you help me design an agent?").await.unwrap();
    assert!(!first.is_agent_design);

    let history = vec![
        ChatTurn::user("Can you help me design an agent?"),
        ChatTurn::maestro(first.text.clone()),
    ];
    let second = planner.chat(&history, "One that tags blog posts").await.unwrap();
    assert!(second.is_agent_design);

    let calls = h.client.calls().await;
    assert!(calls[1].prompt.contains("Maestro: What kind of agent do you need?\nUser: One that tags blog posts"));
    assert_eq!(h.plans.count(&PlanFilter::default()).await.unwrap(), 0, "chat never creates plans");
}

#[tokio::test]
async fn test_generation_failure_surfaces_and_saves_nothing() {
    let h = harness(MockGenerationClient::new().with_default(MockReply::fail("quota exceeded"))).await;

    let err = h.planner().draft_plan("Write a post").await.unwrap_err();

    assert!(err.to_string().contains("quota exceeded"));
    assert_eq!(h.plans.count(&PlanFilter::default()).await.unwrap(), 0);
    let records = h.recorder.list(None).await.unwrap();
    assert_eq!(records[0].error.as_deref(), Some("API error (500): quota exceeded"));
}
