//! Schedule a one-hour calendar meeting

use super::{invalid_arguments, parse_input, Tool, ToolContext};
use crate::state_machine::ActionResult;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const NAME: &str = "schedule_meeting";

pub struct ScheduleMeetingTool;

#[derive(Debug, Deserialize)]
struct ScheduleMeetingInput {
    date: String,
    time: String,
    topic: String,
}

#[async_trait]
impl Tool for ScheduleMeetingTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> String {
        "Schedules a meeting at a given time and date. Only use this for scheduling.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date": { "type": "string" },
                "time": { "type": "string" },
                "topic": { "type": "string" }
            },
            "required": ["date", "time", "topic"]
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ActionResult {
        let input: ScheduleMeetingInput = match parse_input(NAME, input) {
            Ok(input) => input,
            Err(result) => return result,
        };
        if [&input.date, &input.time, &input.topic]
            .iter()
            .any(|v| v.trim().is_empty())
        {
            return invalid_arguments(NAME, "date, time and topic must not be empty");
        }

        match ctx
            .calendar
            .create_event(&ctx.user_id, &input.date, &input.time, &input.topic)
            .await
        {
            Ok(event) => {
                let link = event
                    .event_link
                    .clone()
                    .unwrap_or_else(|| "See result for details".to_string());
                ActionResult::success(
                    format!("Meeting scheduled: {link}"),
                    json!({
                        "status": "success",
                        "eventLink": event.event_link,
                        "eventId": event.event_id,
                    }),
                )
            }
            Err(e) => ActionResult::error(
                format!("Failed to schedule: {e}"),
                json!({ "status": "error", "message": e.to_string() }),
            ),
        }
    }
}
