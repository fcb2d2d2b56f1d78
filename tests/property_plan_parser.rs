use std::collections::HashMap;

use maestro::domain::models::PlanStatus;
use maestro::services::plan_parser::{parse_plan, PlanParseOutcome};
use maestro::services::template;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

fn step_block(ordinal: u32) -> String {
    format!(
        "**Plan Step {ordinal}: Task {ordinal}**\n\
         * **Task Description:** Do part {ordinal}.\n\
         * **Assigned Agent:** `Content Writer Agent`\n\
         * **Assigned Agent Step:** `Write Content Piece`\n\
         * **Input:** Input {ordinal}\n\
         * **Output:** Output {ordinal}\n---\n"
    )
}

proptest! {
    /// Property: parsed steps are ordered by serial number no matter how the
    /// blocks were ordered in the planner text.
    #[test]
    fn prop_steps_sorted_by_serial_number(
        ordinals in Just((1u32..=12).collect::<Vec<_>>()).prop_shuffle(),
        take in 1usize..=12,
    ) {
        let chosen = &ordinals[..take];
        let raw: String = chosen.iter().map(|n| step_block(*n)).collect();

        let PlanParseOutcome::Parsed(plan) = parse_plan(&raw, "goal") else {
            return Err(TestCaseError::fail("expected a parsed plan"));
        };
        prop_assert_eq!(plan.status, PlanStatus::PendingApproval);
        prop_assert_eq!(plan.steps.len(), take);
        for pair in plan.steps.windows(2) {
            prop_assert!(pair[0].serial_number < pair[1].serial_number);
        }

        let mut expected = chosen.to_vec();
        expected.sort_unstable();
        for ((serial, step), ordinal) in (1u32..).zip(&plan.steps).zip(&expected) {
            prop_assert_eq!(step.serial_number, serial);
            prop_assert_eq!(&step.task_name, &format!("Task {ordinal}"));
            prop_assert_eq!(&step.input_summary, &format!("Input {ordinal}"));
        }
    }

    /// Property: serials are 1-based and strictly increasing even when the
    /// planner repeats, skips or zeroes its ordinals.
    #[test]
    fn prop_serials_strictly_increase_for_any_ordinals(ordinals in prop::collection::vec(0u32..4, 1..10)) {
        let raw: String = ordinals.iter().map(|n| step_block(*n)).collect();

        let PlanParseOutcome::Parsed(plan) = parse_plan(&raw, "goal") else {
            return Err(TestCaseError::fail("expected a parsed plan"));
        };
        prop_assert_eq!(plan.steps.len(), ordinals.len());
        for (serial, step) in (1u32..).zip(&plan.steps) {
            prop_assert_eq!(step.serial_number, serial);
        }
    }

    /// Property: text that never mentions plan steps is conversational.
    #[test]
    fn prop_text_without_marker_is_conversational(text in "[a-zA-Z0-9 ,.!?\n]{0,300}") {
        prop_assume!(!text.to_lowercase().contains("plan step"));
        prop_assert_eq!(parse_plan(&text, "goal"), PlanParseOutcome::Conversational);
    }

    /// Property: marker text without step headers keeps the raw text on a
    /// failed plan.
    #[test]
    fn prop_marker_without_headers_is_malformed(prefix in "[a-z ]{0,40}", suffix in "[a-z ]{0,40}") {
        let raw = format!("{prefix} plan step {suffix}");
        let PlanParseOutcome::Malformed(plan) = parse_plan(&raw, "goal") else {
            return Err(TestCaseError::fail("expected a malformed plan"));
        };
        prop_assert_eq!(plan.status, PlanStatus::Failed);
        prop_assert_eq!(plan.raw_plan_text, raw);
        prop_assert!(plan.error.is_some_and(|e| !e.is_empty()));
    }

    /// Property: placeholders without a supplied value survive verbatim.
    #[test]
    fn prop_unknown_placeholders_are_untouched(
        before in "[a-zA-Z .]{0,20}",
        name in "[a-z_]{1,12}",
        after in "[a-zA-Z .]{0,20}",
    ) {
        let text = format!("{before}{{{{{name}}}}}{after}");
        prop_assert_eq!(template::resolve(&text, &HashMap::new()), text.clone());

        let values = HashMap::from([(format!("{name}_other"), "x".to_string())]);
        prop_assert_eq!(template::resolve(&text, &values), text);
    }

    /// Property: substituted values are never scanned for placeholders.
    #[test]
    fn prop_substituted_values_are_not_rescanned(name in "[a-z]{1,8}", inner in "[a-z]{1,8}") {
        prop_assume!(name != inner);
        let values = HashMap::from([
            (name.clone(), format!("{{{{{inner}}}}}")),
            (inner.clone(), "expanded".to_string()),
        ]);
        let resolved = template::resolve(&format!("<{{{{{name}}}}}>"), &values);
        prop_assert_eq!(resolved, format!("<{{{{{inner}}}}}>"));
    }
}
