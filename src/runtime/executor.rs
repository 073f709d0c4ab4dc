//! Turn executor
//!
//! Runs the event loop for one turn. The loop is iterative: each transition
//! yields effects, and each effect yields at most one follow-up event.

use super::traits::{LlmClient, SlotExtractor};
use super::Turn;
use crate::dispatcher::ActionDispatcher;
use crate::llm::LlmRequest;
use crate::state_machine::{
    transition, DialogueState, Effect, Event, ModelDecision, SlotContext, TurnContext,
};
use chrono::Utc;
use chrono_tz::Tz;
use std::sync::Arc;

/// Reply used when the state machine rejects an event
pub const GENERIC_ERROR_REPLY: &str = "Sorry, something went wrong. Please try again.";

/// Result of one turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Input history with this turn's assistant and tool turns appended
    pub history: Vec<Turn>,
    /// Context for the caller to send back next turn
    pub context: SlotContext,
    /// Text of the last assistant turn
    pub reply: String,
}

/// Executes dialogue turns against the collaborators
pub struct TurnRuntime {
    llm: Arc<dyn LlmClient>,
    extractor: Arc<dyn SlotExtractor>,
    dispatcher: ActionDispatcher,
    time_zone: Tz,
}

impl TurnRuntime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        extractor: Arc<dyn SlotExtractor>,
        dispatcher: ActionDispatcher,
        time_zone: Tz,
    ) -> Self {
        Self {
            llm,
            extractor,
            dispatcher,
            time_zone,
        }
    }

    /// Run one turn, taking "today" from the calendar time zone
    pub async fn run_turn(
        &self,
        history: Vec<Turn>,
        context: SlotContext,
        user_id: &str,
    ) -> TurnOutcome {
        let today = Utc::now().with_timezone(&self.time_zone).date_naive();
        self.run_turn_with_context(history, context, &TurnContext::new(user_id, today))
            .await
    }

    pub async fn run_turn_with_context(
        &self,
        history: Vec<Turn>,
        context: SlotContext,
        ctx: &TurnContext,
    ) -> TurnOutcome {
        let text = latest_user_text(&history);
        self.drive(
            DialogueState::initial(context),
            Event::UserTurn { text },
            history,
            ctx,
        )
        .await
    }

    /// Feed `event` into `state` and keep processing the events generated by
    /// executed effects until none are left.
    async fn drive(
        &self,
        mut state: DialogueState,
        event: Event,
        mut history: Vec<Turn>,
        ctx: &TurnContext,
    ) -> TurnOutcome {
        let first_new_turn = history.len();
        let mut events_to_process = vec![event];

        while let Some(event) = events_to_process.pop() {
            // Pure state transition
            let result = match transition(&state, ctx, event) {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(user_id = %ctx.user_id, error = %e, "Transition rejected");
                    history.push(Turn::assistant(GENERIC_ERROR_REPLY));
                    break;
                }
            };

            tracing::debug!(
                user_id = %ctx.user_id,
                from = state.name(),
                to = result.new_state.name(),
                "Dialogue transition"
            );
            state = result.new_state;

            for effect in result.effects {
                if let Some(generated) = self.execute_effect(effect, &mut history, ctx).await {
                    events_to_process.push(generated);
                }
            }
        }

        let reply = history
            .iter()
            .skip(first_new_turn)
            .rev()
            .find(|turn| turn.role == super::TurnRole::Assistant)
            .map(|turn| turn.content.clone())
            .unwrap_or_default();

        TurnOutcome {
            history,
            context: state.slots(),
            reply,
        }
    }

    async fn execute_effect(
        &self,
        effect: Effect,
        history: &mut Vec<Turn>,
        ctx: &TurnContext,
    ) -> Option<Event> {
        match effect {
            Effect::RequestToolSelection => {
                let request = LlmRequest {
                    messages: history.iter().map(Turn::to_llm_message).collect(),
                    tools: self.dispatcher.definitions(),
                };
                match self.llm.complete(&request).await {
                    Ok(response) => Some(Event::ModelDecided(ModelDecision::from_response(
                        &response,
                    ))),
                    Err(e) => {
                        tracing::warn!(
                            user_id = %ctx.user_id,
                            error = %e,
                            "Tool selection failed, falling back to extraction"
                        );
                        Some(Event::ModelFailed)
                    }
                }
            }

            Effect::RequestExtraction {
                text,
                known,
                missing,
            } => {
                let outcome = self.extractor.extract(&text, &known, &missing).await;
                if let Err(e) = &outcome {
                    tracing::warn!(user_id = %ctx.user_id, error = %e, "Slot extraction failed");
                }
                Some(Event::Extracted(outcome))
            }

            Effect::Say { text } => {
                history.push(Turn::assistant(text));
                None
            }

            Effect::DispatchAction { request } => {
                let result = self.dispatcher.dispatch(&request, &ctx.user_id).await;
                Some(Event::ActionCompleted { result })
            }

            Effect::RecordActionResult { name, payload } => {
                history.push(Turn::tool(name, payload.to_string()));
                None
            }
        }
    }
}

fn latest_user_text(history: &[Turn]) -> String {
    history
        .iter()
        .rev()
        .find(|turn| turn.role == super::TurnRole::User)
        .map(|turn| turn.content.clone())
        .unwrap_or_default()
}
