//! HTTP request handlers

use super::types::{
    ChatRequest, ChatResponse, ErrorResponse, StatusResponse, StoreTokensRequest, VersionResponse,
};
use super::AppState;
use crate::google::GoogleCredentials;
use crate::runtime::Turn;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/auth/store-google-tokens", post(store_google_tokens))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let user_id = req
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("User ID (or email) is required for API access.".to_string())
        })?;

    let context = req
        .slot_context()
        .map_err(|e| AppError::BadRequest(format!("Invalid context: {e}")))?;

    tracing::info!(user_id = %user_id, "Chat turn received");
    let outcome = state
        .runtime
        .run_turn(vec![Turn::user(req.message)], context, user_id)
        .await;

    Ok(Json(ChatResponse {
        reply: outcome.reply,
        context: outcome.context,
    }))
}

// ============================================================
// Google token storage
// ============================================================

async fn store_google_tokens(
    State(state): State<AppState>,
    Json(req): Json<StoreTokensRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let client = state.google_client.as_ref().ok_or_else(|| {
        AppError::Internal(
            "Server configuration error: GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET environment variables must be set for token storage/refresh."
                .to_string(),
        )
    })?;

    let credentials = GoogleCredentials::from_tokens(
        req.access_token,
        req.refresh_token,
        req.expires_at,
        &client.client_id,
        &client.client_secret,
    );

    state
        .credentials
        .store_tokens(&req.user_id, credentials)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store tokens: {e}")))?;

    Ok(Json(StatusResponse {
        status: "success",
        message: "Tokens stored/updated successfully.".to_string(),
    }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
