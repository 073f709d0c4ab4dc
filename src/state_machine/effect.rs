//! Effects produced by state transitions

use super::state::{ActionRequest, Slot, SlotContext};
use serde_json::Value;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the model, over the whole history and with the action
    /// declarations attached, whether it selects an action directly
    RequestToolSelection,

    /// Run slot extraction on the (already date-substituted) user text
    RequestExtraction {
        text: String,
        known: SlotContext,
        missing: Vec<Slot>,
    },

    /// Append an assistant message to the history
    Say { text: String },

    /// Hand the decided action to the dispatcher
    DispatchAction { request: ActionRequest },

    /// Append the raw action result to the history as a tool message
    RecordActionResult { name: String, payload: Value },
}

impl Effect {
    pub fn say(text: impl Into<String>) -> Self {
        Effect::Say { text: text.into() }
    }

    pub fn dispatch(request: ActionRequest) -> Self {
        Effect::DispatchAction { request }
    }
}
