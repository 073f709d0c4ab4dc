//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the turn runtime, the action tools and the
//! credential manager with mock implementations.

use crate::extraction::ExtractionFailure;
use crate::google::{CreatedEvent, EmailSummary, GoogleApiError, GoogleCredentials, SentEmail};
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use crate::state_machine::{ExtractionResult, Slot, SlotContext};
use async_trait::async_trait;
use std::sync::Arc;

/// Client for making LLM requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete an LLM request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;
}

/// Turns free text into slot values
#[async_trait]
pub trait SlotExtractor: Send + Sync {
    /// Extract the missing slots from `text`, given what is already known
    async fn extract(
        &self,
        text: &str,
        known: &SlotContext,
        missing: &[Slot],
    ) -> Result<ExtractionResult, ExtractionFailure>;
}

/// Calendar integration
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Create a one-hour event if the slot is free
    async fn create_event(
        &self,
        user_id: &str,
        date: &str,
        time: &str,
        topic: &str,
    ) -> Result<CreatedEvent, GoogleApiError>;
}

/// Email integration
#[async_trait]
pub trait MailService: Send + Sync {
    async fn send_email(
        &self,
        user_id: &str,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<SentEmail, GoogleApiError>;

    /// Summarize the newest inbox message in one sentence
    async fn summarize_last_email(&self, user_id: &str) -> Result<EmailSummary, GoogleApiError>;
}

/// Persistent credential storage keyed by user id
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Option<GoogleCredentials>, String>;

    async fn store(&self, user_id: &str, credentials: &GoogleCredentials) -> Result<(), String>;
}

/// Exchanges a refresh token for a new access token
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(
        &self,
        credentials: &GoogleCredentials,
    ) -> Result<GoogleCredentials, GoogleApiError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }
}

#[async_trait]
impl<T: SlotExtractor + ?Sized> SlotExtractor for Arc<T> {
    async fn extract(
        &self,
        text: &str,
        known: &SlotContext,
        missing: &[Slot],
    ) -> Result<ExtractionResult, ExtractionFailure> {
        (**self).extract(text, known, missing).await
    }
}

#[async_trait]
impl<T: CalendarService + ?Sized> CalendarService for Arc<T> {
    async fn create_event(
        &self,
        user_id: &str,
        date: &str,
        time: &str,
        topic: &str,
    ) -> Result<CreatedEvent, GoogleApiError> {
        (**self).create_event(user_id, date, time, topic).await
    }
}

#[async_trait]
impl<T: MailService + ?Sized> MailService for Arc<T> {
    async fn send_email(
        &self,
        user_id: &str,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<SentEmail, GoogleApiError> {
        (**self).send_email(user_id, to_email, subject, body).await
    }

    async fn summarize_last_email(&self, user_id: &str) -> Result<EmailSummary, GoogleApiError> {
        (**self).summarize_last_email(user_id).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

use crate::db::Database;

/// Adapter to use Database as `CredentialStore`
#[derive(Clone)]
pub struct DatabaseCredentialStore {
    db: Database,
}

impl DatabaseCredentialStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for DatabaseCredentialStore {
    async fn load(&self, user_id: &str) -> Result<Option<GoogleCredentials>, String> {
        self.db.load_credentials(user_id).map_err(|e| e.to_string())
    }

    async fn store(&self, user_id: &str, credentials: &GoogleCredentials) -> Result<(), String> {
        self.db
            .store_credentials(user_id, credentials)
            .map_err(|e| e.to_string())
    }
}

/// Adapter to use an `LlmService` as `LlmClient`
pub struct ServiceLlmClient {
    service: Arc<dyn LlmService>,
}

impl ServiceLlmClient {
    pub fn new(service: Arc<dyn LlmService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl LlmClient for ServiceLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.service.complete(request).await
    }
}
