//! API request and response types

use crate::state_machine::SlotContext;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Chat turn request
///
/// `user_id` and `context` are only checked after the request has been
/// authorized, so an unusable id is always a 401 rather than a parse error.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Missing or null means an empty context
    #[serde(default)]
    pub context: Option<Value>,
    /// Anything but a string counts as missing
    #[serde(default, deserialize_with = "string_or_none")]
    pub user_id: Option<String>,
}

impl ChatRequest {
    pub fn slot_context(&self) -> Result<SlotContext, serde_json::Error> {
        match &self.context {
            Some(value) => SlotContext::deserialize(value),
            None => Ok(SlotContext::default()),
        }
    }
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Chat turn response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub context: SlotContext,
}

/// Tokens handed over by the sign-in frontend
#[derive(Debug, Deserialize)]
pub struct StoreTokensRequest {
    pub user_id: String,
    pub refresh_token: String,
    pub access_token: String,
    /// Seconds since the Unix epoch
    pub expires_at: i64,
}

/// Status + message response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
}

/// Version response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
