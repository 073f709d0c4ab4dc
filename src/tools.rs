//! Action tools the model can select
//!
//! Tools are stateless singletons. Everything a call needs arrives through
//! [`ToolContext`], and every call produces exactly one [`ActionResult`].

mod schedule_meeting;
mod send_email;
mod summarize_email;

pub use schedule_meeting::ScheduleMeetingTool;
pub use send_email::SendEmailTool;
pub use summarize_email::SummarizeEmailTool;

use crate::runtime::{CalendarService, MailService};
use crate::state_machine::ActionResult;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

/// All context needed for a tool invocation
#[derive(Clone)]
pub struct ToolContext {
    /// The user the action runs for; selects the stored credentials
    pub user_id: String,

    pub calendar: Arc<dyn CalendarService>,

    pub mail: Arc<dyn MailService>,
}

impl ToolContext {
    pub fn new(
        user_id: impl Into<String>,
        calendar: Arc<dyn CalendarService>,
        mail: Arc<dyn MailService>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            calendar,
            mail,
        }
    }
}

/// Trait for actions that can be selected by the model
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool with all context provided via `ToolContext`
    async fn run(&self, input: Value, ctx: ToolContext) -> ActionResult;
}

/// Deserialize tool input, or build the error result for bad arguments
pub(crate) fn parse_input<T: DeserializeOwned>(
    tool: &str,
    input: Value,
) -> Result<T, ActionResult> {
    serde_json::from_value(input).map_err(|e| invalid_arguments(tool, &e.to_string()))
}

pub(crate) fn invalid_arguments(tool: &str, detail: &str) -> ActionResult {
    let message = format!("Invalid arguments for {tool}: {detail}");
    ActionResult::error(
        message.clone(),
        json!({ "status": "error", "message": message }),
    )
}

/// Collection of tools available to the assistant
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create the standard registry: scheduling, sending and summarizing
    pub fn standard() -> Self {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(ScheduleMeetingTool),
            Arc::new(SendEmailTool),
            Arc::new(SummarizeEmailTool),
        ];
        Self { tools }
    }

    /// Get all tool definitions for LLM
    pub fn definitions(&self) -> Vec<crate::llm::ToolDefinition> {
        self.tools
            .iter()
            .map(|t| crate::llm::ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name with context. `None` if no tool has that name.
    pub async fn execute(&self, name: &str, input: Value, ctx: ToolContext) -> Option<ActionResult> {
        for tool in &self.tools {
            if tool.name() == name {
                return Some(tool.run(input, ctx).await);
            }
        }
        None
    }
}
