//! Per-user credential management
//!
//! Load, refresh-if-expired and store run as one operation under a per-user
//! lock, so two concurrent actions for the same user refresh at most once.

use super::{GoogleApiError, GoogleCredentials, HTTP_TIMEOUT};
use crate::runtime::{CredentialStore, TokenRefresher};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Serializes credential access per user id
pub struct CredentialManager {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl CredentialManager {
    pub fn new(store: Arc<dyn CredentialStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to one user's credentials. The map entry is
    /// dropped again on release when no other task is waiting for it.
    async fn lock_user(&self, user_id: &str) -> UserLockGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        UserLockGuard {
            locks: &self.locks,
            user_id: user_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn tracked_users(&self) -> usize {
        self.locks.lock().unwrap().len()
    }

    /// Get a valid access token for the user, refreshing and persisting the
    /// credentials first if they are expired.
    pub async fn access_token(&self, user_id: &str) -> Result<String, GoogleApiError> {
        let _guard = self.lock_user(user_id).await;

        let credentials = self
            .store
            .load(user_id)
            .await
            .map_err(GoogleApiError::Store)?
            .ok_or_else(GoogleApiError::not_authorized)?;

        if !credentials.is_expired(Utc::now()) {
            return Ok(credentials.token);
        }

        tracing::info!(user_id = %user_id, "Refreshing expired Google credentials");
        let refreshed = self.refresh(&credentials).await?;
        self.store
            .store(user_id, &refreshed)
            .await
            .map_err(GoogleApiError::Store)?;
        Ok(refreshed.token)
    }

    /// Persist newly issued credentials, refreshing them first if the access
    /// token has already expired.
    pub async fn store_tokens(
        &self,
        user_id: &str,
        credentials: GoogleCredentials,
    ) -> Result<(), GoogleApiError> {
        let _guard = self.lock_user(user_id).await;

        let credentials = if credentials.is_expired(Utc::now()) && credentials.refresh_token.is_some()
        {
            self.refresh(&credentials).await?
        } else {
            credentials
        };

        self.store
            .store(user_id, &credentials)
            .await
            .map_err(GoogleApiError::Store)?;
        tracing::info!(user_id = %user_id, "Stored Google credentials");
        Ok(())
    }

    async fn refresh(
        &self,
        credentials: &GoogleCredentials,
    ) -> Result<GoogleCredentials, GoogleApiError> {
        if credentials.refresh_token.is_none() {
            return Err(GoogleApiError::not_authorized());
        }
        self.refresher.refresh(credentials).await
    }
}

struct UserLockGuard<'a> {
    locks: &'a Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    user_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLockGuard<'_> {
    fn drop(&mut self) {
        // Release first so only the map and any waiters hold the mutex
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.user_id);
        }
    }
}

// ============================================================================
// OAuth refresh
// ============================================================================

/// Refreshes access tokens against the credentials' token endpoint
pub struct OAuthRefresher {
    client: reqwest::Client,
}

impl OAuthRefresher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for OAuthRefresher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(serde::Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[async_trait]
impl TokenRefresher for OAuthRefresher {
    async fn refresh(
        &self,
        credentials: &GoogleCredentials,
    ) -> Result<GoogleCredentials, GoogleApiError> {
        let refresh_token = credentials
            .refresh_token
            .as_deref()
            .ok_or_else(GoogleApiError::not_authorized)?;

        let mut form = vec![
            ("client_id", credentials.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        if let Some(secret) = credentials.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let resp = self
            .client
            .post(&credentials.token_uri)
            .form(&form)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(map_refresh_error(status.as_u16(), &body));
        }

        let parsed: RefreshResponse = serde_json::from_str(&body)?;
        Ok(apply_refresh(credentials, parsed, Utc::now()))
    }
}

fn apply_refresh(
    credentials: &GoogleCredentials,
    response: RefreshResponse,
    now: chrono::DateTime<Utc>,
) -> GoogleCredentials {
    let expires_in = response.expires_in.unwrap_or(3600);
    let mut refreshed = credentials.clone();
    refreshed.token = response.access_token;
    refreshed.expiry = Some((now + chrono::Duration::seconds(expires_in)).to_rfc3339());
    if let Some(rotated) = response.refresh_token {
        refreshed.refresh_token = Some(rotated);
    }
    refreshed
}

fn map_refresh_error(status: u16, body: &str) -> GoogleApiError {
    let lowered = body.to_lowercase();
    if (status == 400 || status == 401)
        && (lowered.contains("invalid_grant") || lowered.contains("token has been expired"))
    {
        return GoogleApiError::not_authorized();
    }
    GoogleApiError::RefreshFailed(format!("HTTP {status}: {body}"))
}
