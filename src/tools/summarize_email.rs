//! Summarize the newest inbox message

use super::{Tool, ToolContext};
use crate::state_machine::ActionResult;
use async_trait::async_trait;
use serde_json::{json, Value};

const NAME: &str = "summarize_last_email";

pub struct SummarizeEmailTool;

#[async_trait]
impl Tool for SummarizeEmailTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> String {
        "Fetches and summarizes the content of the last received email in the user's inbox."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {}, "required": [] })
    }

    // Takes no arguments; anything the model passes is ignored.
    async fn run(&self, _input: Value, ctx: ToolContext) -> ActionResult {
        match ctx.mail.summarize_last_email(&ctx.user_id).await {
            Ok(summary) => ActionResult::success(
                format!("Last email summary: **{}**", summary.summary),
                json!({
                    "status": "success",
                    "snippet": summary.snippet,
                    "summary": summary.summary,
                }),
            ),
            Err(e) => ActionResult::error(
                format!("Failed to summarize email: {e}"),
                json!({ "status": "error", "message": e.to_string() }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{MockCalendar, MockMail};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_summary_is_bolded() {
        let ctx = ToolContext::new(
            "user@example.com",
            Arc::new(MockCalendar::new()),
            Arc::new(MockMail::new()),
        );
        let result = SummarizeEmailTool.run(json!({}), ctx).await;
        assert_eq!(
            result.message,
            "Last email summary: **Summary: Budget review moved to Friday**"
        );
        assert_eq!(result.payload["snippet"], "Budget review moved to Friday");
    }

    #[tokio::test]
    async fn test_empty_inbox_fails() {
        let ctx = ToolContext::new(
            "user@example.com",
            Arc::new(MockCalendar::new()),
            Arc::new(MockMail::empty_inbox()),
        );
        let result = SummarizeEmailTool.run(Value::Null, ctx).await;
        assert!(!result.is_success());
        assert_eq!(
            result.message,
            "Failed to summarize email: No emails found in the inbox."
        );
    }
}
