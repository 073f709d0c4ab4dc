//! Google API client for Calendar and Gmail
//!
//! Direct HTTP via reqwest. Credentials are loaded per user from the
//! credential store and refreshed through the OAuth token endpoint when they
//! are close to expiry.
//!
//! Modules:
//! - calendar: free/busy check and event insertion (Calendar API v3)
//! - credentials: per-user load/refresh/store and the OAuth refresher
//! - gmail: send and summarize (Gmail API v1)

mod calendar;
mod credentials;
mod gmail;

pub use calendar::GoogleCalendar;
pub use credentials::{CredentialManager, OAuthRefresher};
pub use gmail::Gmail;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OAuth token endpoint
pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Credentials are treated as expired this long before their actual expiry
const EXPIRY_SKEW_SECS: i64 = 60;

/// Request timeout for every Google and OAuth call
pub(crate) const HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

// ============================================================================
// Credentials
// ============================================================================

/// OAuth credentials persisted per user.
///
/// Field names follow the google-auth token JSON so stored rows stay
/// readable by other Google tooling. `access_token` is accepted on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleCredentials {
    #[serde(alias = "access_token")]
    pub token: String,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// RFC 3339 expiry of the access token
    #[serde(default)]
    pub expiry: Option<String>,
}

fn default_token_uri() -> String {
    TOKEN_URI.to_string()
}

impl GoogleCredentials {
    /// Build credentials from the tokens handed over by the sign-in frontend.
    /// `expires_at` is seconds since the Unix epoch.
    pub fn from_tokens(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: i64,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        let refresh_token = refresh_token.into();
        Self {
            token: access_token.into(),
            refresh_token: (!refresh_token.trim().is_empty()).then_some(refresh_token),
            token_uri: default_token_uri(),
            client_id: client_id.into(),
            client_secret: Some(client_secret.into()),
            scopes: vec![],
            expiry: DateTime::<Utc>::from_timestamp(expires_at, 0).map(|t| t.to_rfc3339()),
        }
    }

    /// Whether the access token must be refreshed before use.
    ///
    /// Credentials without an expiry are used as-is; an unparseable expiry
    /// is treated as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match &self.expiry {
            None => false,
            Some(expiry) => match DateTime::parse_from_rfc3339(expiry) {
                Ok(expiry) => expiry <= now + Duration::seconds(EXPIRY_SKEW_SECS),
                Err(_) => true,
            },
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// An inserted calendar event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreatedEvent {
    pub event_link: Option<String>,
    pub event_id: Option<String>,
}

/// A message accepted by Gmail
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SentEmail {
    pub message_id: Option<String>,
}

/// The newest inbox message, summarized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSummary {
    pub snippet: String,
    pub summary: String,
}

// ============================================================================
// Error type
// ============================================================================

/// Errors from the Google integrations. `Display` is user-facing: action
/// tools put it directly into the reply.
#[derive(Debug, thiserror::Error)]
pub enum GoogleApiError {
    #[error("Authorization error: {0}")]
    NotAuthorized(String),
    #[error("The selected time slot is not available. Please choose another time.")]
    SlotUnavailable,
    #[error("No emails found in the inbox.")]
    EmptyInbox,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Google API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
    #[error("Credential storage error: {0}")]
    Store(String),
    #[error("Summarization failed: {0}")]
    Summary(#[from] crate::llm::LlmError),
}

impl GoogleApiError {
    pub fn not_authorized() -> Self {
        GoogleApiError::NotAuthorized(
            "User not authorized or session expired. Please re-connect your Google account."
                .to_string(),
        )
    }
}

/// Map a non-success Google API response to an error
pub(crate) async fn check_response(
    resp: reqwest::Response,
) -> Result<reqwest::Response, GoogleApiError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GoogleApiError::not_authorized());
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GoogleApiError::Api {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(resp)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn with_expiry(expiry: Option<&str>) -> GoogleCredentials {
        GoogleCredentials {
            token: "ya29.token".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            token_uri: TOKEN_URI.to_string(),
            client_id: "client".to_string(),
            client_secret: None,
            scopes: vec![],
            expiry: expiry.map(String::from),
        }
    }

    #[test]
    fn test_expiry_in_future_is_valid() {
        assert!(!with_expiry(Some("2026-10-18T13:00:00+00:00")).is_expired(now()));
    }

    #[test]
    fn test_expiry_in_past_is_expired() {
        assert!(with_expiry(Some("2026-10-18T11:00:00Z")).is_expired(now()));
    }

    #[test]
    fn test_expiry_within_skew_is_expired() {
        assert!(with_expiry(Some("2026-10-18T12:00:30+00:00")).is_expired(now()));
    }

    #[test]
    fn test_missing_expiry_is_valid_and_garbage_is_expired() {
        assert!(!with_expiry(None).is_expired(now()));
        assert!(with_expiry(Some("tomorrow-ish")).is_expired(now()));
    }

    #[test]
    fn test_from_tokens_converts_epoch_seconds() {
        let creds = GoogleCredentials::from_tokens("ya29.a", "1//r", 1_792_324_800, "id", "secret");
        assert_eq!(creds.expiry.as_deref(), Some("2026-10-18T12:00:00+00:00"));
        assert_eq!(creds.refresh_token.as_deref(), Some("1//r"));
        assert_eq!(creds.token_uri, TOKEN_URI);
    }

    #[test]
    fn test_from_tokens_drops_blank_refresh_token() {
        let creds = GoogleCredentials::from_tokens("ya29.a", " ", 0, "id", "secret");
        assert!(creds.refresh_token.is_none());
    }

    #[test]
    fn test_credentials_accept_access_token_alias() {
        let creds: GoogleCredentials = serde_json::from_str(
            r#"{"access_token": "ya29.alias", "refresh_token": null, "client_id": "id"}"#,
        )
        .unwrap();
        assert_eq!(creds.token, "ya29.alias");
        assert_eq!(creds.token_uri, TOKEN_URI);
        assert!(creds.expiry.is_none());
    }

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(
            GoogleApiError::SlotUnavailable.to_string(),
            "The selected time slot is not available. Please choose another time."
        );
        assert_eq!(
            GoogleApiError::not_authorized().to_string(),
            "Authorization error: User not authorized or session expired. Please re-connect your Google account."
        );
    }
}
