//! Multi-turn slot-filling dialogue state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
mod normalize;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, ModelDecision};
pub use normalize::{normalize_time, parse_date};
pub use state::{
    ActionName, ActionRequest, ActionResult, ActionStatus, DialogueState, ExtractionResult, Route,
    Slot, SlotContext, TurnContext,
};
pub use transition::transition;
