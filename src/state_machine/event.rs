//! Events that drive the dialogue state machine

use super::state::{ActionResult, ExtractionResult};
use crate::extraction::ExtractionFailure;
use crate::llm::LlmResponse;
use serde_json::{Map, Value};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// The latest user message of the turn
    UserTurn { text: String },

    /// Result of the tool-selection model call
    ModelDecided(ModelDecision),

    /// The tool-selection call itself failed; the executor logs the cause
    ModelFailed,

    /// Result of the slot extraction call
    Extracted(Result<ExtractionResult, ExtractionFailure>),

    /// The dispatcher finished the decided action
    ActionCompleted { result: ActionResult },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserTurn { .. } => "user_turn",
            Event::ModelDecided(_) => "model_decided",
            Event::ModelFailed => "model_failed",
            Event::Extracted(_) => "extracted",
            Event::ActionCompleted { .. } => "action_completed",
        }
    }
}

/// What the tool-selection call concluded
#[derive(Debug, Clone, PartialEq)]
pub enum ModelDecision {
    /// The model called a function directly
    DirectAction {
        name: String,
        args: Map<String, Value>,
    },
    /// No function call; slots have to be extracted from the text
    NeedsExtraction,
}

impl ModelDecision {
    /// Classify a model response. A function call anywhere in the response
    /// takes precedence over any accompanying text.
    pub fn from_response(response: &LlmResponse) -> Self {
        match response.first_tool_use() {
            Some((name, input)) => ModelDecision::DirectAction {
                name: name.to_string(),
                args: input.as_object().cloned().unwrap_or_default(),
            },
            None => ModelDecision::NeedsExtraction,
        }
    }
}
