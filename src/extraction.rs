//! Slot extraction through the language model
//!
//! Builds the extraction prompt from the known and missing slots, and parses
//! the model's JSON answer into an [`ExtractionResult`].

use crate::llm::{LlmRequest, LlmService};
use crate::runtime::SlotExtractor;
use crate::state_machine::{ExtractionResult, Slot, SlotContext};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::fmt::Write;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?").expect("valid regex"));

/// Why extraction produced no usable result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("extraction model call failed: {0}")]
    Model(String),
    #[error("malformed extraction output: {0}")]
    Malformed(String),
}

/// Extractor backed by a plain (tool-less) completion call
pub struct LlmSlotExtractor {
    llm: Arc<dyn LlmService>,
}

impl LlmSlotExtractor {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl SlotExtractor for LlmSlotExtractor {
    async fn extract(
        &self,
        text: &str,
        known: &SlotContext,
        missing: &[Slot],
    ) -> Result<ExtractionResult, ExtractionFailure> {
        let prompt = build_prompt(text, known, missing);
        let response = self
            .llm
            .complete(&LlmRequest::prompt(prompt))
            .await
            .map_err(|e| ExtractionFailure::Model(e.to_string()))?;

        let raw = response.text();
        tracing::debug!(raw = %raw, "Extraction response");
        parse_extraction(&raw)
    }
}

pub(crate) fn build_prompt(text: &str, known: &SlotContext, missing: &[Slot]) -> String {
    let mut prompt = String::from(
        "You are an assistant that extracts missing meeting details from the user message.\n\
         Current known values:\n",
    );
    for slot in Slot::ALL {
        let label = match slot {
            Slot::Date => "Date",
            Slot::Time => "Time",
            Slot::Topic => "Topic",
        };
        let value = known.get(slot).map_or("None", String::as_str);
        let _ = writeln!(prompt, "- {label}: {value}");
    }

    let hint = missing
        .iter()
        .map(|slot| slot.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let _ = write!(
        prompt,
        "\nExtract only the missing fields ({}) from this message:\nUser: {text}\n\n",
        if hint.is_empty() { "none" } else { &hint },
    );
    prompt.push_str(
        "Respond in this exact JSON format:\n\
         {\"date\": \"<date or null>\", \"time\": \"<time or null>\", \"topic\": \"<topic or null>\", \"follow_up\": \"<question if any>\"}",
    );
    prompt
}

/// Parse the model output, tolerating a Markdown code fence around the JSON
pub(crate) fn parse_extraction(raw: &str) -> Result<ExtractionResult, ExtractionFailure> {
    let mut content = raw.trim().to_string();
    if content.starts_with("```") {
        content = CODE_FENCE
            .replace_all(&content, "")
            .trim_matches(|c: char| c == '`' || c.is_whitespace())
            .to_string();
    }

    let value: Value = serde_json::from_str(&content)
        .map_err(|e| ExtractionFailure::Malformed(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(ExtractionFailure::Malformed(
            "expected a JSON object".to_string(),
        ));
    };

    Ok(ExtractionResult {
        date: field(&fields, "date"),
        time: field(&fields, "time"),
        topic: field(&fields, "topic"),
        follow_up: field(&fields, "follow_up"),
    })
}

/// A usable string field. Models sometimes answer a literal "null".
fn field(fields: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    let text = match fields.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let placeholder = text.is_empty()
        || text.eq_ignore_ascii_case("null")
        || text.eq_ignore_ascii_case("none");
    (!placeholder).then_some(text)
}
