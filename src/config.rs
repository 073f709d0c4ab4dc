//! Process configuration from environment variables
//!
//! `main` loads an optional `.env` file first, so either source works.

use chrono_tz::Tz;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIME_ZONE: &str = "Asia/Kolkata";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set in the environment")]
    Missing(&'static str),
    #[error("invalid ASSISTANT_PORT: {0}")]
    InvalidPort(String),
    #[error("invalid CALENDAR_TIME_ZONE: {0}")]
    InvalidTimeZone(String),
}

/// OAuth client used to refresh user tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub llm_gateway: Option<String>,
    /// `None` unless both client id and secret are set
    pub google_client: Option<GoogleClientConfig>,
    pub time_zone: Tz,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_api_key = get("GEMINI_API_KEY").ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

        let port = match get("ASSISTANT_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let db_path = get("ASSISTANT_DB_PATH").map_or_else(
            || {
                let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.meeting-agent/tokens.db"))
            },
            PathBuf::from,
        );

        let zone_name = get("CALENDAR_TIME_ZONE").unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string());
        let time_zone: Tz = zone_name
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidTimeZone(zone_name.clone()))?;

        let google_client = match (get("GOOGLE_CLIENT_ID"), get("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(GoogleClientConfig {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        Ok(Self {
            port,
            db_path,
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_gateway: get("LLM_GATEWAY"),
            google_client,
            time_zone,
        })
    }
}
