//! Gmail API v1: send a message and summarize the newest inbox message.

use super::{check_response, CredentialManager, EmailSummary, GoogleApiError, SentEmail, HTTP_TIMEOUT};
use crate::llm::{LlmRequest, LlmService};
use crate::runtime::MailService;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const GMAIL_API: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageStub>,
}

#[derive(Debug, Deserialize)]
struct MessageStub {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageDetail {
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// Mail collaborator backed by the Gmail API
pub struct Gmail {
    client: reqwest::Client,
    credentials: Arc<CredentialManager>,
    summarizer: Arc<dyn LlmService>,
    base_url: String,
}

impl Gmail {
    pub fn new(credentials: Arc<CredentialManager>, summarizer: Arc<dyn LlmService>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            credentials,
            summarizer,
            base_url: GMAIL_API.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn latest_inbox_snippet(&self, token: &str) -> Result<String, GoogleApiError> {
        let resp = self
            .client
            .get(format!("{}/messages", self.base_url))
            .bearer_auth(token)
            .query(&[("maxResults", "1"), ("labelIds", "INBOX")])
            .send()
            .await?;
        let list: MessageListResponse = check_response(resp).await?.json().await?;
        let newest = list.messages.first().ok_or(GoogleApiError::EmptyInbox)?;

        let resp = self
            .client
            .get(format!("{}/messages/{}", self.base_url, newest.id))
            .bearer_auth(token)
            .query(&[("format", "full")])
            .send()
            .await?;
        let detail: MessageDetail = check_response(resp).await?.json().await?;
        Ok(detail.snippet)
    }
}

#[async_trait]
impl MailService for Gmail {
    async fn send_email(
        &self,
        user_id: &str,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<SentEmail, GoogleApiError> {
        let raw = encode_message(to_email, subject, body)?;
        let token = self.credentials.access_token(user_id).await?;

        let resp = self
            .client
            .post(format!("{}/messages/send", self.base_url))
            .bearer_auth(&token)
            .json(&json!({ "raw": raw }))
            .send()
            .await?;
        let sent: SendResponse = check_response(resp).await?.json().await?;

        tracing::info!(user_id = %user_id, message_id = ?sent.id, "Email sent");
        Ok(SentEmail { message_id: sent.id })
    }

    async fn summarize_last_email(&self, user_id: &str) -> Result<EmailSummary, GoogleApiError> {
        let token = self.credentials.access_token(user_id).await?;
        let snippet = self.latest_inbox_snippet(&token).await?;

        let prompt =
            format!("Provide a concise, one-sentence summary of this email snippet: {snippet}");
        let response = self.summarizer.complete(&LlmRequest::prompt(prompt)).await?;

        Ok(EmailSummary {
            snippet,
            summary: response.text().trim().to_string(),
        })
    }
}

// ============================================================================
// MIME encoding
// ============================================================================

/// Raw bytes per body line; encodes to the 76-character base64 line limit.
const BODY_CHUNK_BYTES: usize = 57;

/// Build a plain-text MIME message and encode it as URL-safe base64, the
/// form Gmail's `messages.send` expects in `raw`.
pub(crate) fn encode_message(to: &str, subject: &str, body: &str) -> Result<String, GoogleApiError> {
    if [to, subject].iter().any(|h| h.contains(['\r', '\n'])) {
        return Err(GoogleApiError::InvalidInput(
            "Email headers must not contain line breaks".to_string(),
        ));
    }

    let b64 = &base64::engine::general_purpose::STANDARD;
    let message = format!(
        "Content-Type: text/plain; charset=\"utf-8\"\r\n\
         MIME-Version: 1.0\r\n\
         Content-Transfer-Encoding: base64\r\n\
         to: {to}\r\n\
         from: me\r\n\
         subject: {}\r\n\
         \r\n\
         {}\r\n",
        encode_header(subject),
        body.as_bytes()
            .chunks(BODY_CHUNK_BYTES)
            .map(|chunk| b64.encode(chunk))
            .collect::<Vec<_>>()
            .join("\r\n"),
    );
    Ok(base64::engine::general_purpose::URL_SAFE.encode(message.as_bytes()))
}

/// RFC 2047 encoded-word for non-ASCII header values
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        let encoded = base64::engine::general_purpose::STANDARD.encode(value.as_bytes());
        format!("=?UTF-8?B?{encoded}?=")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, LlmResponse};
    use crate::runtime::testing::{spawn_test_server, MockCredentialStore, MockTokenRefresher};
    use axum::extract::{Path, State};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::Value;
    use std::sync::Mutex;

    fn decode(raw: &str) -> String {
        let bytes = base64::engine::general_purpose::URL_SAFE.decode(raw).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_message_headers_and_body() {
        let mime = decode(&encode_message("bob@example.com", "Hello", "See you at 4.").unwrap());
        assert!(mime.contains("to: bob@example.com\r\n"));
        assert!(mime.contains("from: me\r\n"));
        assert!(mime.contains("subject: Hello\r\n"));

        let body_b64 = base64::engine::general_purpose::STANDARD.encode("See you at 4.");
        assert!(mime.ends_with(&format!("\r\n\r\n{body_b64}\r\n")));
    }

    #[test]
    fn test_long_body_is_wrapped_into_short_lines() {
        let body = "Agenda item. ".repeat(160);
        let mime = decode(&encode_message("bob@example.com", "Agenda", &body).unwrap());

        let (_, encoded_body) = mime.split_once("\r\n\r\n").unwrap();
        let lines: Vec<&str> = encoded_body.trim_end().split("\r\n").collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.len() <= 76));
        assert!(mime.split("\r\n").all(|line| line.len() <= 998));

        let joined = lines.concat();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(joined)
            .unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), body);
    }

    #[test]
    fn test_non_ascii_subject_is_encoded() {
        let mime = decode(&encode_message("bob@example.com", "Grüße", "hi").unwrap());
        assert!(mime.contains("subject: =?UTF-8?B?"));
        assert!(!mime.contains("Grüße"));
    }

    #[test]
    fn test_header_injection_is_rejected() {
        let err = encode_message("bob@example.com\r\nbcc: eve@example.com", "Hi", "x").unwrap_err();
        assert!(matches!(err, GoogleApiError::InvalidInput(_)));
    }

    // ------------------------------------------------------------------
    // HTTP behavior against a local fake of the Gmail API
    // ------------------------------------------------------------------

    const SUMMARY_MODEL: &str = "fixed";

    struct FixedSummarizer;

    #[async_trait]
    impl LlmService for FixedSummarizer {
        async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            let prompt = serde_json::to_string(&request.messages[0].content).unwrap_or_default();
            assert!(prompt.contains("one-sentence summary"));
            Ok(LlmResponse::from_text("  Alice confirms the budget review.  "))
        }

        fn model_id(&self) -> &str {
            SUMMARY_MODEL
        }
    }

    #[derive(Clone, Default)]
    struct FakeGmail {
        empty_inbox: bool,
        sent: Arc<Mutex<Vec<Value>>>,
    }

    async fn list_messages(State(fake): State<FakeGmail>) -> Json<Value> {
        if fake.empty_inbox {
            Json(json!({"resultSizeEstimate": 0}))
        } else {
            Json(json!({"messages": [{"id": "m-1", "threadId": "t-1"}]}))
        }
    }

    async fn get_message(Path(id): Path<String>) -> Json<Value> {
        Json(json!({"id": id, "snippet": "Budget review moved to Friday"}))
    }

    async fn send_message(State(fake): State<FakeGmail>, Json(body): Json<Value>) -> Json<Value> {
        fake.sent.lock().unwrap().push(body);
        Json(json!({"id": "sent-1"}))
    }

    async fn gmail_for(fake: FakeGmail) -> Gmail {
        let router = Router::new()
            .route("/messages", get(list_messages))
            .route("/messages/:id", get(get_message))
            .route("/messages/send", post(send_message))
            .with_state(fake);
        let base_url = spawn_test_server(router).await;

        let store = MockCredentialStore::new().with_valid_user("user@example.com");
        let credentials = Arc::new(CredentialManager::new(
            Arc::new(store),
            Arc::new(MockTokenRefresher::new("ya29.new")),
        ));
        Gmail::new(credentials, Arc::new(FixedSummarizer)).with_base_url(base_url)
    }

    #[tokio::test]
    async fn test_send_posts_raw_message() {
        let fake = FakeGmail::default();
        let gmail = gmail_for(fake.clone()).await;

        let sent = gmail
            .send_email("user@example.com", "bob@example.com", "Hi", "Body")
            .await
            .unwrap();
        assert_eq!(sent.message_id.as_deref(), Some("sent-1"));

        let bodies = fake.sent.lock().unwrap().clone();
        let raw = bodies[0]["raw"].as_str().unwrap();
        assert!(decode(raw).contains("to: bob@example.com"));
    }

    #[tokio::test]
    async fn test_summarize_uses_newest_snippet() {
        let gmail = gmail_for(FakeGmail::default()).await;
        let summary = gmail.summarize_last_email("user@example.com").await.unwrap();
        assert_eq!(summary.snippet, "Budget review moved to Friday");
        assert_eq!(summary.summary, "Alice confirms the budget review.");
    }

    #[tokio::test]
    async fn test_empty_inbox_is_reported() {
        let gmail = gmail_for(FakeGmail {
            empty_inbox: true,
            ..Default::default()
        })
        .await;
        let err = gmail.summarize_last_email("user@example.com").await.unwrap_err();
        assert_eq!(err.to_string(), "No emails found in the inbox.");
    }
}
