//! Property-based tests for the dialogue state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::normalize::{normalize_date, normalize_time, substitute_relative_dates};
use super::state::ExtractStage;
use super::{
    transition, ActionName, DialogueState, Effect, Event, ExtractionResult, ModelDecision, Route,
    Slot, SlotContext, TurnContext,
};
use crate::extraction::ExtractionFailure;
use chrono::{Days, NaiveDate};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> TurnContext {
    TurnContext::new("test-user", NaiveDate::from_ymd_opt(2026, 10, 18).unwrap())
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// Slot values including blanks, which must behave as unset
fn arb_slot_value() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("  ".to_string())),
        "[a-zA-Z0-9 :-]{1,20}".prop_map(Some),
    ]
}

fn arb_slot_context() -> impl Strategy<Value = SlotContext> {
    (arb_slot_value(), arb_slot_value(), arb_slot_value())
        .prop_map(|(date, time, topic)| SlotContext { date, time, topic })
}

fn arb_extraction() -> impl Strategy<Value = ExtractionResult> {
    (
        arb_slot_value(),
        arb_slot_value(),
        arb_slot_value(),
        proptest::option::of("[a-zA-Z ?]{1,30}"),
    )
        .prop_map(|(date, time, topic, follow_up)| ExtractionResult {
            date,
            time,
            topic,
            follow_up,
        })
}

fn arb_extraction_outcome() -> impl Strategy<Value = Result<ExtractionResult, ExtractionFailure>> {
    prop_oneof![
        3 => arb_extraction().prop_map(Ok),
        1 => "[a-z ]{1,20}".prop_map(|m| Err(ExtractionFailure::Malformed(m))),
    ]
}

// ============================================================================
// Merge Properties
// ============================================================================

proptest! {
    /// A slot filled before a merge is still filled, with the same value, after it
    #[test]
    fn prop_merge_is_monotonic(known in arb_slot_context(), extracted in arb_extraction()) {
        let merged = known.merge(&extracted);
        for slot in Slot::ALL {
            if known.is_filled(slot) {
                prop_assert_eq!(merged.get(slot), known.get(slot));
            }
        }
    }

    #[test]
    fn prop_merge_is_idempotent(known in arb_slot_context(), extracted in arb_extraction()) {
        let once = known.merge(&extracted);
        let twice = once.merge(&extracted);
        prop_assert_eq!(once, twice);
    }

    /// Merging never produces a blank value
    #[test]
    fn prop_merge_has_no_blank_slots(known in arb_slot_context(), extracted in arb_extraction()) {
        let merged = known.merge(&extracted);
        for slot in Slot::ALL {
            if let Some(value) = merged.get(slot) {
                prop_assert!(!value.trim().is_empty());
            }
        }
    }
}

// ============================================================================
// Transition Properties
// ============================================================================

proptest! {
    /// schedule_meeting is only ever requested with all three slots filled
    #[test]
    fn prop_schedule_request_has_all_slots(
        known in arb_slot_context(),
        outcome in arb_extraction_outcome(),
    ) {
        let state = DialogueState::Extracting {
            stage: ExtractStage::Slots,
            text: "anything".to_string(),
            slots: known,
        };
        let result = transition(&state, &test_context(), Event::Extracted(outcome)).unwrap();

        for effect in &result.effects {
            if let Effect::DispatchAction { request } = effect {
                prop_assert_eq!(&request.name, &ActionName::ScheduleMeeting);
                for slot in Slot::ALL {
                    let value = request.args.get(slot.as_str()).and_then(|v| v.as_str());
                    prop_assert!(value.is_some_and(|v| !v.trim().is_empty()));
                }
            }
        }
    }

    /// Extraction never aborts a turn: every outcome ends in a ready action
    /// or a follow-up question
    #[test]
    fn prop_extraction_always_resolves(
        known in arb_slot_context(),
        outcome in arb_extraction_outcome(),
    ) {
        let state = DialogueState::Extracting {
            stage: ExtractStage::Slots,
            text: "anything".to_string(),
            slots: known.clone(),
        };
        let result = transition(&state, &test_context(), Event::Extracted(outcome)).unwrap();

        match &result.new_state {
            DialogueState::ActionReady { .. } => {
                prop_assert_eq!(result.new_state.route(), Route::Dispatch);
            }
            DialogueState::NeedMoreInfo { follow_up, slots } => {
                prop_assert!(!follow_up.trim().is_empty());
                prop_assert!(!slots.is_complete());
                for slot in Slot::ALL {
                    if known.is_filled(slot) {
                        prop_assert!(slots.is_filled(slot));
                    }
                }
                prop_assert_eq!(result.effects.len(), 1);
            }
            other => prop_assert!(false, "unexpected state {:?}", other),
        }
    }

    /// A direct call to a non-scheduling action is always dispatched as-is
    #[test]
    fn prop_direct_non_schedule_action_dispatches(
        name in "[a-z_]{1,20}".prop_filter("not schedule", |n| n != "schedule_meeting"),
        known in arb_slot_context(),
    ) {
        let state = DialogueState::Extracting {
            stage: ExtractStage::Selecting,
            text: "anything".to_string(),
            slots: known,
        };
        let result = transition(
            &state,
            &test_context(),
            Event::ModelDecided(ModelDecision::DirectAction { name: name.clone(), args: serde_json::Map::new() }),
        ).unwrap();

        let DialogueState::ActionReady { request } = &result.new_state else {
            return Err(TestCaseError::fail("expected ActionReady"));
        };
        prop_assert_eq!(request.name.as_str(), name.as_str());
    }

    /// Every user turn starts with the tool-selection call and keeps the context
    #[test]
    fn prop_user_turn_keeps_context(known in arb_slot_context(), text in "[a-zA-Z ]{0,40}") {
        let result = transition(
            &DialogueState::initial(known.clone()),
            &test_context(),
            Event::UserTurn { text },
        ).unwrap();
        prop_assert_eq!(result.effects, vec![Effect::RequestToolSelection]);
        prop_assert_eq!(result.new_state.slots(), known);
    }
}

// ============================================================================
// Normalization Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_iso_dates_are_fixed_points(days in 0u64..20_000) {
        let base = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        let date = base.checked_add_days(Days::new(days)).unwrap();
        let iso = date.format("%Y-%m-%d").to_string();
        prop_assert_eq!(normalize_date(&iso, test_context().today), iso);
    }

    #[test]
    fn prop_tomorrow_after_substitution_is_next_day(days in 0u64..20_000) {
        let base = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        let today = base.checked_add_days(Days::new(days)).unwrap();
        let substituted = substitute_relative_dates("tomorrow", today);
        let expected = today.checked_add_days(Days::new(1)).unwrap().format("%Y-%m-%d").to_string();
        prop_assert_eq!(normalize_date(&substituted, today), expected);
    }

    #[test]
    fn prop_valid_times_normalize(hour in 1u32..=12, minute in 0u32..60, pm in any::<bool>(), spaced in any::<bool>()) {
        let suffix = if pm { "pm" } else { "am" };
        let sep = if spaced { " " } else { "" };
        let raw = format!("{hour}:{minute:02}{sep}{suffix}");
        let expected = format!("{hour:02}:{minute:02} {}", suffix.to_uppercase());
        prop_assert_eq!(normalize_time(&raw), expected.clone());
        // Normalized output is itself accepted unchanged
        prop_assert_eq!(normalize_time(&expected), expected);
    }

    #[test]
    fn prop_unparseable_times_pass_through(raw in "[a-z]{1,10}") {
        prop_assume!(!raw.ends_with("am") && !raw.ends_with("pm"));
        prop_assert_eq!(normalize_time(&raw), raw);
    }
}
