//! HTTP API for the assistant
//!
//! `POST /chat`, `POST /auth/store-google-tokens` and `GET /version`.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::config::GoogleClientConfig;
use crate::google::CredentialManager;
use crate::runtime::TurnRuntime;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<TurnRuntime>,
    pub credentials: Arc<CredentialManager>,
    /// OAuth client stamped into stored credentials; required for token storage
    pub google_client: Option<GoogleClientConfig>,
}

impl AppState {
    pub fn new(
        runtime: Arc<TurnRuntime>,
        credentials: Arc<CredentialManager>,
        google_client: Option<GoogleClientConfig>,
    ) -> Self {
        Self {
            runtime,
            credentials,
            google_client,
        }
    }
}
