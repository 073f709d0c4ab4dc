//! Google Calendar API v3: availability check and event insertion.

use super::{check_response, CreatedEvent, CredentialManager, GoogleApiError, HTTP_TIMEOUT};
use crate::runtime::CalendarService;
use crate::state_machine::{normalize_time, parse_date};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";
const CALENDAR_ID: &str = "primary";
const MEETING_LENGTH_HOURS: i64 = 1;

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<serde_json::Value>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedEvent {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    html_link: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// Calendar collaborator backed by the Google Calendar API
pub struct GoogleCalendar {
    client: reqwest::Client,
    credentials: Arc<CredentialManager>,
    time_zone: Tz,
    base_url: String,
}

impl GoogleCalendar {
    pub fn new(credentials: Arc<CredentialManager>, time_zone: Tz) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            credentials,
            time_zone,
            base_url: CALENDAR_API.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn is_free(
        &self,
        token: &str,
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
    ) -> Result<bool, GoogleApiError> {
        let body = json!({
            "timeMin": start.fixed_offset().to_rfc3339(),
            "timeMax": end.fixed_offset().to_rfc3339(),
            "timeZone": self.time_zone.name(),
            "items": [{ "id": CALENDAR_ID }],
        });

        let resp = self
            .client
            .post(format!("{}/freeBusy", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let parsed: FreeBusyResponse = resp.json().await?;

        let calendar = parsed.calendars.get(CALENDAR_ID).ok_or_else(|| GoogleApiError::Api {
            status: 200,
            message: "free/busy response is missing the primary calendar".to_string(),
        })?;
        if !calendar.errors.is_empty() {
            return Err(GoogleApiError::Api {
                status: 200,
                message: format!("free/busy query failed: {:?}", calendar.errors),
            });
        }
        Ok(calendar.busy.is_empty())
    }

    async fn insert(
        &self,
        token: &str,
        topic: &str,
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
    ) -> Result<CreatedEvent, GoogleApiError> {
        let zone = self.time_zone.name();
        let body = json!({
            "summary": topic,
            "start": { "dateTime": start.fixed_offset().to_rfc3339(), "timeZone": zone },
            "end": { "dateTime": end.fixed_offset().to_rfc3339(), "timeZone": zone },
        });

        let resp = self
            .client
            .post(format!("{}/calendars/{CALENDAR_ID}/events", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let event: InsertedEvent = resp.json().await?;

        Ok(CreatedEvent {
            event_link: event.html_link,
            event_id: event.id,
        })
    }
}

#[async_trait]
impl CalendarService for GoogleCalendar {
    async fn create_event(
        &self,
        user_id: &str,
        date: &str,
        time: &str,
        topic: &str,
    ) -> Result<CreatedEvent, GoogleApiError> {
        let token = self.credentials.access_token(user_id).await?;
        let today = Utc::now().with_timezone(&self.time_zone).date_naive();
        let (start, end) = meeting_window(date, time, self.time_zone, today)?;

        if !self.is_free(&token, &start, &end).await? {
            tracing::info!(user_id = %user_id, start = %start, "Requested slot is busy");
            return Err(GoogleApiError::SlotUnavailable);
        }

        let event = self.insert(&token, topic, &start, &end).await?;
        tracing::info!(user_id = %user_id, event_id = ?event.event_id, "Calendar event created");
        Ok(event)
    }
}

// ============================================================================
// Time resolution
// ============================================================================

/// Resolve date and time strings into a one-hour window in `zone`
pub(crate) fn meeting_window(
    date: &str,
    time: &str,
    zone: Tz,
    today: NaiveDate,
) -> Result<(DateTime<Tz>, DateTime<Tz>), GoogleApiError> {
    let unparseable =
        || GoogleApiError::InvalidInput(format!("Event creation failed: could not understand '{date} {time}'"));

    let day = parse_date(date, today).ok_or_else(unparseable)?;
    let clock = parse_clock(time).ok_or_else(unparseable)?;
    let start = zone
        .from_local_datetime(&day.and_time(clock))
        .earliest()
        .ok_or_else(unparseable)?;
    let end = start + Duration::hours(MEETING_LENGTH_HOURS);
    Ok((start, end))
}

fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let normalized = normalize_time(raw);
    ["%I:%M %p", "%H:%M", "%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(normalized.trim(), format).ok())
}
