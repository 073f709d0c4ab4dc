//! Pure state transition function
//!
//! Given the same state, turn context and event, `transition` always produces
//! the same result and performs no I/O. Model calls and dispatch happen in the
//! runtime, which feeds their outcomes back in as events.

use super::normalize::substitute_relative_dates;
use super::state::{
    ActionName, ActionRequest, DialogueState, ExtractStage, ExtractionResult, SlotContext,
    TurnContext,
};
use super::{Effect, Event, ModelDecision};
use thiserror::Error;

/// Prompt used when extraction produced no usable output
pub const FALLBACK_FOLLOW_UP: &str = "Sorry, I didn't understand. Can you rephrase?";

/// Prompt used when extraction succeeded but asked nothing
pub const DEFAULT_FOLLOW_UP: &str = "Could you provide more details?";

/// Assistant message emitted once slot filling completes
pub const SCHEDULING_MESSAGE: &str = "Let me schedule that for you.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: DialogueState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: DialogueState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition: {event} in state {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

/// Pure transition function
pub fn transition(
    state: &DialogueState,
    context: &TurnContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // New user turn
        // ============================================================
        (
            DialogueState::AwaitingInput { slots } | DialogueState::NeedMoreInfo { slots, .. },
            Event::UserTurn { text },
        ) => Ok(TransitionResult::new(DialogueState::Extracting {
            stage: ExtractStage::Selecting,
            text,
            slots: slots.clone(),
        })
        .with_effect(Effect::RequestToolSelection)),

        // ============================================================
        // Direct tool selection
        // ============================================================
        (
            DialogueState::Extracting {
                stage: ExtractStage::Selecting,
                text,
                slots,
            },
            Event::ModelDecided(ModelDecision::DirectAction { name, args }),
        ) => {
            let action = ActionName::parse(&name);
            if action != ActionName::ScheduleMeeting {
                return Ok(action_ready(
                    ActionRequest::new(action, args),
                    format!("Attempting to call {name}..."),
                ));
            }

            // Slots the model left out fall back to what we already know.
            let proposed = ExtractionResult::from_args(&args).normalized(context.today);
            let candidate = slots.overlay(&proposed);
            match ActionRequest::schedule(&candidate) {
                Some(request) => Ok(action_ready(request, format!("Attempting to call {name}..."))),
                None => Ok(request_extraction(text.clone(), candidate, context)),
            }
        }

        (
            DialogueState::Extracting {
                stage: ExtractStage::Selecting,
                text,
                slots,
            },
            Event::ModelDecided(ModelDecision::NeedsExtraction) | Event::ModelFailed,
        ) => Ok(request_extraction(text.clone(), slots.clone(), context)),

        // ============================================================
        // Slot extraction, merge, decide
        // ============================================================
        (
            DialogueState::Extracting {
                stage: ExtractStage::Slots,
                slots,
                ..
            },
            Event::Extracted(outcome),
        ) => {
            let extracted = outcome
                .unwrap_or_else(|_| ExtractionResult::unresolved(FALLBACK_FOLLOW_UP))
                .normalized(context.today);
            let merged = slots.merge(&extracted);

            if let Some(request) = ActionRequest::schedule(&merged) {
                return Ok(action_ready(request, SCHEDULING_MESSAGE.to_string()));
            }

            let follow_up = extracted
                .follow_up
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FOLLOW_UP.to_string());
            Ok(TransitionResult::new(DialogueState::NeedMoreInfo {
                follow_up: follow_up.clone(),
                slots: merged,
            })
            .with_effect(Effect::say(follow_up)))
        }

        // ============================================================
        // Dispatch completed: report and reset the context
        // ============================================================
        (DialogueState::ActionReady { request }, Event::ActionCompleted { result }) => {
            Ok(TransitionResult::new(DialogueState::initial(SlotContext::default()))
                .with_effect(Effect::RecordActionResult {
                    name: request.name.to_string(),
                    payload: result.payload,
                })
                .with_effect(Effect::say(result.message)))
        }

        (state, event) => Err(TransitionError::InvalidTransition {
            state: state.name(),
            event: event.name(),
        }),
    }
}

fn action_ready(request: ActionRequest, announcement: String) -> TransitionResult {
    TransitionResult::new(DialogueState::ActionReady {
        request: request.clone(),
    })
    .with_effect(Effect::say(announcement))
    .with_effect(Effect::dispatch(request))
}

fn request_extraction(text: String, slots: SlotContext, context: &TurnContext) -> TransitionResult {
    let prepared = substitute_relative_dates(&text, context.today);
    let missing = slots.missing();
    TransitionResult::new(DialogueState::Extracting {
        stage: ExtractStage::Slots,
        text,
        slots: slots.clone(),
    })
    .with_effect(Effect::RequestExtraction {
        text: prepared,
        known: slots,
        missing,
    })
}
