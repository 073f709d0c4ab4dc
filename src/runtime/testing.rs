//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::extraction::ExtractionFailure;
use crate::google::{CreatedEvent, EmailSummary, GoogleApiError, GoogleCredentials, SentEmail};
use crate::llm::{LlmError, LlmRequest, LlmResponse};
use crate::state_machine::{ExtractionResult, Slot, SlotContext};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

// ============================================================================
// Mock Slot Extractor
// ============================================================================

/// A recorded extraction call
#[derive(Debug, Clone)]
pub struct ExtractionCall {
    pub text: String,
    pub known: SlotContext,
    pub missing: Vec<Slot>,
}

/// Mock extractor that returns queued results
pub struct MockSlotExtractor {
    results: Mutex<VecDeque<Result<ExtractionResult, ExtractionFailure>>>,
    pub calls: Mutex<Vec<ExtractionCall>>,
}

impl MockSlotExtractor {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self, result: Result<ExtractionResult, ExtractionFailure>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn recorded_calls(&self) -> Vec<ExtractionCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SlotExtractor for MockSlotExtractor {
    async fn extract(
        &self,
        text: &str,
        known: &SlotContext,
        missing: &[Slot],
    ) -> Result<ExtractionResult, ExtractionFailure> {
        self.calls.lock().unwrap().push(ExtractionCall {
            text: text.to_string(),
            known: known.clone(),
            missing: missing.to_vec(),
        });
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ExtractionFailure::Model("No mock result queued".to_string())))
    }
}

// ============================================================================
// Mock Calendar
// ============================================================================

/// Mock calendar that records calls; optionally reports every slot as busy
pub struct MockCalendar {
    busy: bool,
    pub calls: Mutex<Vec<(String, String, String, String)>>,
}

impl MockCalendar {
    pub fn new() -> Self {
        Self {
            busy: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn busy() -> Self {
        Self {
            busy: true,
            ..Self::new()
        }
    }

    /// Recorded `(user_id, date, time, topic)` calls
    pub fn recorded_calls(&self) -> Vec<(String, String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarService for MockCalendar {
    async fn create_event(
        &self,
        user_id: &str,
        date: &str,
        time: &str,
        topic: &str,
    ) -> Result<CreatedEvent, GoogleApiError> {
        self.calls.lock().unwrap().push((
            user_id.to_string(),
            date.to_string(),
            time.to_string(),
            topic.to_string(),
        ));
        if self.busy {
            return Err(GoogleApiError::SlotUnavailable);
        }
        Ok(CreatedEvent {
            event_link: Some("https://calendar.google.com/event?eid=mock".to_string()),
            event_id: Some("mock-event".to_string()),
        })
    }
}

// ============================================================================
// Mock Mail
// ============================================================================

/// Mock mailbox with a configurable newest message
pub struct MockMail {
    newest_snippet: Option<String>,
    pub sent: Mutex<Vec<(String, String, String, String)>>,
    pub summaries: AtomicUsize,
}

impl MockMail {
    pub fn new() -> Self {
        Self {
            newest_snippet: Some("Budget review moved to Friday".to_string()),
            sent: Mutex::new(Vec::new()),
            summaries: AtomicUsize::new(0),
        }
    }

    pub fn empty_inbox() -> Self {
        Self {
            newest_snippet: None,
            ..Self::new()
        }
    }

    /// Recorded `(user_id, to, subject, body)` sends
    pub fn recorded_sends(&self) -> Vec<(String, String, String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn summary_count(&self) -> usize {
        self.summaries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailService for MockMail {
    async fn send_email(
        &self,
        user_id: &str,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<SentEmail, GoogleApiError> {
        self.sent.lock().unwrap().push((
            user_id.to_string(),
            to_email.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(SentEmail {
            message_id: Some("mock-message".to_string()),
        })
    }

    async fn summarize_last_email(&self, _user_id: &str) -> Result<EmailSummary, GoogleApiError> {
        self.summaries.fetch_add(1, Ordering::SeqCst);
        let snippet = self
            .newest_snippet
            .clone()
            .ok_or(GoogleApiError::EmptyInbox)?;
        Ok(EmailSummary {
            summary: format!("Summary: {snippet}"),
            snippet,
        })
    }
}

// ============================================================================
// Mock Credential Store
// ============================================================================

/// In-memory credential store
pub struct MockCredentialStore {
    rows: Mutex<HashMap<String, GoogleCredentials>>,
    fail_writes: bool,
    stores: AtomicUsize,
}

impl MockCredentialStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            fail_writes: false,
            stores: AtomicUsize::new(0),
        }
    }

    pub fn with_user(self, user_id: &str, credentials: GoogleCredentials) -> Self {
        self.rows
            .lock()
            .unwrap()
            .insert(user_id.to_string(), credentials);
        self
    }

    /// Add a user whose access token is good for another hour
    pub fn with_valid_user(self, user_id: &str) -> Self {
        let expiry = chrono::Utc::now() + chrono::Duration::hours(1);
        self.with_user(
            user_id,
            GoogleCredentials {
                token: "ya29.valid".to_string(),
                refresh_token: Some("1//refresh".to_string()),
                token_uri: crate::google::TOKEN_URI.to_string(),
                client_id: "client".to_string(),
                client_secret: Some("secret".to_string()),
                scopes: vec![],
                expiry: Some(expiry.to_rfc3339()),
            },
        )
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn get(&self, user_id: &str) -> Option<GoogleCredentials> {
        self.rows.lock().unwrap().get(user_id).cloned()
    }

    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn load(&self, user_id: &str) -> Result<Option<GoogleCredentials>, String> {
        Ok(self.get(user_id))
    }

    async fn store(&self, user_id: &str, credentials: &GoogleCredentials) -> Result<(), String> {
        if self.fail_writes {
            return Err("disk full".to_string());
        }
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .unwrap()
            .insert(user_id.to_string(), credentials.clone());
        Ok(())
    }
}

// ============================================================================
// Mock Token Refresher
// ============================================================================

/// Refresher that hands out a fixed token, optionally after a delay
pub struct MockTokenRefresher {
    token: String,
    delay: Duration,
    refreshes: AtomicUsize,
}

impl MockTokenRefresher {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            delay: Duration::ZERO,
            refreshes: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for MockTokenRefresher {
    async fn refresh(
        &self,
        credentials: &GoogleCredentials,
    ) -> Result<GoogleCredentials, GoogleApiError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let expiry = chrono::Utc::now() + chrono::Duration::hours(1);
        Ok(GoogleCredentials {
            token: self.token.clone(),
            expiry: Some(expiry.to_rfc3339()),
            ..credentials.clone()
        })
    }
}

// ============================================================================
// Local HTTP server
// ============================================================================

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn_test_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
