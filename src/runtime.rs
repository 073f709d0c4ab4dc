//! Runtime for executing dialogue turns
//!
//! Drives the pure state machine through one turn: executes each effect
//! against the collaborators and feeds the outcome back in as an event.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::TurnRuntime;
pub use traits::*;

use crate::llm::{ContentBlock, LlmMessage, MessageRole};
use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
    Tool,
}

/// One entry of the ordered conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    /// Action name, for tool turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            name: None,
        }
    }

    pub fn tool(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Tool,
            content: content.into(),
            name: Some(name.into()),
        }
    }

    pub fn to_llm_message(&self) -> LlmMessage {
        match self.role {
            TurnRole::User => LlmMessage {
                role: MessageRole::User,
                content: vec![ContentBlock::text(&self.content)],
            },
            TurnRole::Assistant => LlmMessage {
                role: MessageRole::Assistant,
                content: vec![ContentBlock::text(&self.content)],
            },
            TurnRole::Tool => LlmMessage {
                role: MessageRole::Tool,
                content: vec![ContentBlock::tool_result(
                    self.name.as_deref().unwrap_or_default(),
                    &self.content,
                    false,
                )],
            },
        }
    }
}
