//! Dialogue state and slot types

use super::normalize::{normalize_date, normalize_time};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// Slots
// ============================================================================

/// One required field of a scheduling intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Date,
    Time,
    Topic,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Date, Slot::Time, Slot::Topic];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Date => "date",
            Slot::Time => "time",
            Slot::Topic => "topic",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-blank value or nothing. Blank strings never count as a filled slot.
fn filled(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

/// Slot values accumulated across turns for one scheduling intent.
///
/// Owned by the caller and echoed back and forth over HTTP; the state
/// machine only ever reads one and produces a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotContext {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

impl SlotContext {
    pub fn get(&self, slot: Slot) -> Option<&String> {
        match slot {
            Slot::Date => self.date.as_ref(),
            Slot::Time => self.time.as_ref(),
            Slot::Topic => self.topic.as_ref(),
        }
    }

    pub fn is_filled(&self, slot: Slot) -> bool {
        filled(self.get(slot)).is_some()
    }

    pub fn is_complete(&self) -> bool {
        Slot::ALL.iter().all(|slot| self.is_filled(*slot))
    }

    /// Slots still needed, in canonical order
    pub fn missing(&self) -> Vec<Slot> {
        Slot::ALL
            .into_iter()
            .filter(|slot| !self.is_filled(*slot))
            .collect()
    }

    /// Known value wins; the fresh extraction only fills gaps.
    ///
    /// Monotonic (a filled slot is never unset) and idempotent for a fixed
    /// extraction.
    #[must_use]
    pub fn merge(&self, extracted: &ExtractionResult) -> SlotContext {
        SlotContext {
            date: filled(self.date.as_ref()).or_else(|| filled(extracted.date.as_ref())),
            time: filled(self.time.as_ref()).or_else(|| filled(extracted.time.as_ref())),
            topic: filled(self.topic.as_ref()).or_else(|| filled(extracted.topic.as_ref())),
        }
    }

    /// Model-proposed values win; known values fill what the model left out.
    /// Used when the model selects `schedule_meeting` directly.
    #[must_use]
    pub fn overlay(&self, proposed: &ExtractionResult) -> SlotContext {
        SlotContext {
            date: filled(proposed.date.as_ref()).or_else(|| filled(self.date.as_ref())),
            time: filled(proposed.time.as_ref()).or_else(|| filled(self.time.as_ref())),
            topic: filled(proposed.topic.as_ref()).or_else(|| filled(self.topic.as_ref())),
        }
    }
}

/// Structured output of one extraction call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub follow_up: Option<String>,
}

impl ExtractionResult {
    /// Nothing resolved, with a prompt for the user
    pub fn unresolved(follow_up: impl Into<String>) -> Self {
        Self {
            follow_up: Some(follow_up.into()),
            ..Self::default()
        }
    }

    /// Pull slot values out of a model function call's arguments
    pub fn from_args(args: &Map<String, Value>) -> Self {
        let text = |key: &str| args.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            date: text("date"),
            time: text("time"),
            topic: text("topic"),
            follow_up: None,
        }
    }

    /// Apply date and time normalization; blank values become `None`.
    #[must_use]
    pub fn normalized(self, today: NaiveDate) -> Self {
        Self {
            date: filled(self.date.as_ref()).map(|d| normalize_date(&d, today)),
            time: filled(self.time.as_ref()).map(|t| normalize_time(&t)),
            topic: filled(self.topic.as_ref()),
            follow_up: self.follow_up,
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Actions the model may select
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionName {
    ScheduleMeeting,
    SendEmailMessage,
    SummarizeLastEmail,
    /// A name the model produced that no action answers to
    Other(String),
}

impl ActionName {
    pub fn parse(name: &str) -> Self {
        match name {
            "schedule_meeting" => Self::ScheduleMeeting,
            "send_email_message" => Self::SendEmailMessage,
            "summarize_last_email" => Self::SummarizeLastEmail,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ScheduleMeeting => "schedule_meeting",
            Self::SendEmailMessage => "send_email_message",
            Self::SummarizeLastEmail => "summarize_last_email",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decided action, consumed exactly once by the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub name: ActionName,
    pub args: Map<String, Value>,
}

impl ActionRequest {
    pub fn new(name: ActionName, args: Map<String, Value>) -> Self {
        Self { name, args }
    }

    /// Build a `schedule_meeting` request. Returns `None` unless every slot
    /// is filled.
    pub fn schedule(slots: &SlotContext) -> Option<Self> {
        if !slots.is_complete() {
            return None;
        }
        let mut args = Map::new();
        for slot in Slot::ALL {
            if let Some(value) = slots.get(slot) {
                args.insert(slot.as_str().to_string(), Value::String(value.clone()));
            }
        }
        Some(Self::new(ActionName::ScheduleMeeting, args))
    }
}

/// Outcome status of a dispatched action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Error,
}

/// Result of a dispatched action: the user-facing message plus the raw
/// collaborator payload kept for the history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    pub message: String,
    pub payload: Value,
}

impl ActionResult {
    pub fn success(message: impl Into<String>, payload: Value) -> Self {
        Self {
            status: ActionStatus::Success,
            message: message.into(),
            payload,
        }
    }

    pub fn error(message: impl Into<String>, payload: Value) -> Self {
        Self {
            status: ActionStatus::Error,
            message: message.into(),
            payload,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}

// ============================================================================
// Dialogue State
// ============================================================================

/// Which model call an `Extracting` turn is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStage {
    /// Whole-history call that may select an action directly
    Selecting,
    /// Slot extraction over the latest user message
    Slots,
}

/// Per-turn dialogue state
#[derive(Debug, Clone, PartialEq)]
pub enum DialogueState {
    /// Waiting for the user. Initial state, and where a turn ends after an
    /// action was dispatched.
    AwaitingInput { slots: SlotContext },

    /// Consulting the model about the latest user message
    Extracting {
        stage: ExtractStage,
        text: String,
        slots: SlotContext,
    },

    /// An action has been decided and must be dispatched
    ActionReady { request: ActionRequest },

    /// Some slots are still missing; the follow-up question was sent
    NeedMoreInfo {
        follow_up: String,
        slots: SlotContext,
    },
}

impl DialogueState {
    pub fn initial(slots: SlotContext) -> Self {
        DialogueState::AwaitingInput { slots }
    }

    /// Context to hand back to the caller
    pub fn slots(&self) -> SlotContext {
        match self {
            DialogueState::AwaitingInput { slots }
            | DialogueState::Extracting { slots, .. }
            | DialogueState::NeedMoreInfo { slots, .. } => slots.clone(),
            DialogueState::ActionReady { .. } => SlotContext::default(),
        }
    }

    /// Where control goes after this state
    pub fn route(&self) -> Route {
        match self {
            DialogueState::ActionReady { .. } => Route::Dispatch,
            _ => Route::End,
        }
    }

    /// True once the turn has nothing left to do
    pub fn is_turn_over(&self) -> bool {
        matches!(
            self,
            DialogueState::AwaitingInput { .. } | DialogueState::NeedMoreInfo { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            DialogueState::AwaitingInput { .. } => "awaiting_input",
            DialogueState::Extracting { .. } => "extracting",
            DialogueState::ActionReady { .. } => "action_ready",
            DialogueState::NeedMoreInfo { .. } => "need_more_info",
        }
    }
}

/// Routing signal for the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Invoke the dispatcher now
    Dispatch,
    /// Return control to the user
    End,
}

/// Per-turn inputs that are not part of the dialogue state
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub user_id: String,
    /// Current date in the calendar's reference time zone
    pub today: NaiveDate,
}

impl TurnContext {
    pub fn new(user_id: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            today,
        }
    }
}
