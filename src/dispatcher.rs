//! Action dispatcher
//!
//! Executes a decided [`ActionRequest`] exactly once against the registered
//! tools. Unknown names are reported, never executed.

use crate::llm::ToolDefinition;
use crate::runtime::{CalendarService, MailService};
use crate::state_machine::{ActionRequest, ActionResult};
use crate::tools::{ToolContext, ToolRegistry};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

pub struct ActionDispatcher {
    registry: ToolRegistry,
    calendar: Arc<dyn CalendarService>,
    mail: Arc<dyn MailService>,
}

impl ActionDispatcher {
    pub fn new(
        registry: ToolRegistry,
        calendar: Arc<dyn CalendarService>,
        mail: Arc<dyn MailService>,
    ) -> Self {
        Self {
            registry,
            calendar,
            mail,
        }
    }

    /// Declarations offered to the model for direct tool selection
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    pub async fn dispatch(&self, request: &ActionRequest, user_id: &str) -> ActionResult {
        let name = request.name.as_str();
        let ctx = ToolContext::new(user_id, self.calendar.clone(), self.mail.clone());
        let start = Instant::now();

        let result = self
            .registry
            .execute(name, Value::Object(request.args.clone()), ctx)
            .await
            .unwrap_or_else(|| {
                let message = format!("Unknown command: {name}");
                ActionResult::error(
                    message,
                    json!({ "status": "error", "message": "Unknown function call." }),
                )
            });

        tracing::info!(
            user_id = %user_id,
            action = %name,
            success = result.is_success(),
            duration_ms = %start.elapsed().as_millis(),
            "Action dispatched"
        );
        result
    }
}
