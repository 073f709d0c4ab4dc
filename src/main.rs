//! Meeting Agent - conversational scheduling and email assistant
//!
//! An HTTP backend that drives a slot-filling dialogue state machine,
//! dispatching Google Calendar and Gmail actions chosen by an LLM.

mod api;
mod config;
mod db;
mod dispatcher;
mod extraction;
mod google;
mod llm;
mod runtime;
mod state_machine;
mod tools;

use api::{create_router, AppState};
use config::AppConfig;
use db::Database;
use dispatcher::ActionDispatcher;
use extraction::LlmSlotExtractor;
use google::{CredentialManager, Gmail, GoogleCalendar, OAuthRefresher};
use llm::{GeminiService, LlmService, LoggingService};
use runtime::{DatabaseCredentialStore, ServiceLlmClient, TurnRuntime};
use std::net::SocketAddr;
use std::sync::Arc;
use tools::ToolRegistry;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meeting_agent=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env()?;
    if config.google_client.is_none() {
        tracing::warn!(
            "GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET not set; token storage is disabled"
        );
    }

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening token database");
    let db = Database::open(&config.db_path)?;

    let gemini: Arc<dyn LlmService> = Arc::new(GeminiService::new(
        config.gemini_api_key.clone(),
        &config.gemini_model,
        config.llm_gateway.as_deref(),
    ));
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(gemini));
    tracing::info!(model = %llm.model_id(), time_zone = %config.time_zone.name(), "LLM initialized");

    let credentials = Arc::new(CredentialManager::new(
        Arc::new(DatabaseCredentialStore::new(db)),
        Arc::new(OAuthRefresher::new()),
    ));
    let calendar = Arc::new(GoogleCalendar::new(credentials.clone(), config.time_zone));
    let mail = Arc::new(Gmail::new(credentials.clone(), llm.clone()));

    let dispatcher = ActionDispatcher::new(ToolRegistry::standard(), calendar, mail);
    let runtime = Arc::new(TurnRuntime::new(
        Arc::new(ServiceLlmClient::new(llm.clone())),
        Arc::new(LlmSlotExtractor::new(llm)),
        dispatcher,
        config.time_zone,
    ));

    let state = AppState::new(runtime, credentials, config.google_client.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Meeting agent listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
