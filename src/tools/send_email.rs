//! Send an email through the user's mailbox

use super::{invalid_arguments, parse_input, Tool, ToolContext};
use crate::state_machine::ActionResult;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::LazyLock;

const NAME: &str = "send_email_message";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("valid regex"));

pub struct SendEmailTool;

#[derive(Debug, Deserialize)]
struct SendEmailInput {
    to_email: String,
    subject: String,
    body: String,
}

/// Basic recipient syntax check
pub fn is_valid_email(address: &str) -> bool {
    EMAIL_RE.is_match(address)
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> String {
        "Sends an email to a recipient with a subject and body.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "to_email": {
                    "type": "string",
                    "description": "The recipient's full email address."
                },
                "subject": {
                    "type": "string",
                    "description": "The subject line of the email."
                },
                "body": {
                    "type": "string",
                    "description": "The content of the email message."
                }
            },
            "required": ["to_email", "subject", "body"]
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ActionResult {
        let input: SendEmailInput = match parse_input(NAME, input) {
            Ok(input) => input,
            Err(result) => return result,
        };
        let to = input.to_email.trim();
        if !is_valid_email(to) {
            return invalid_arguments(NAME, &format!("'{to}' is not a valid email address"));
        }

        match ctx
            .mail
            .send_email(&ctx.user_id, to, &input.subject, &input.body)
            .await
        {
            Ok(sent) => {
                let id = sent.message_id.as_deref().unwrap_or("unknown");
                ActionResult::success(
                    format!("Email sent successfully to {to}. Status: success."),
                    json!({
                        "status": "success",
                        "message": format!(
                            "Email sent to {to} with subject '{}'. Message ID: {id}",
                            input.subject
                        ),
                    }),
                )
            }
            Err(e) => ActionResult::error(
                format!("Failed to send email: {e}"),
                json!({ "status": "error", "message": e.to_string() }),
            ),
        }
    }
}
