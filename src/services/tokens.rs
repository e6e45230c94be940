// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token lifecycle for the athlete's credential set.
//!
//! The credential store is the only durable state. Every refresh writes back
//! the access token, its expiry and whatever refresh token Strava returned,
//! since Strava may rotate the refresh token on each exchange.

use crate::db::CredentialStore;
use crate::error::AppError;
use crate::models::credentials::keys;
use crate::models::CredentialSet;
use crate::services::strava::{StravaClient, TokenResponse};
use crate::time_utils::now_unix;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Refresh access tokens 5 minutes before they expire.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Hands out valid access tokens, refreshing and persisting as needed.
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    client: StravaClient,
    /// Held across refresh so concurrent callers never spend the same
    /// refresh token twice.
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>, client: StravaClient) -> Self {
        Self {
            store,
            client,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Get a valid access token, refreshing if necessary.
    ///
    /// Missing client id, client secret or refresh token is a configuration
    /// error raised before any network call.
    pub async fn get_valid_access_token(&self) -> Result<String, AppError> {
        let credentials = CredentialSet::load(self.store.as_ref())?;
        if let Some(token) = credentials.usable_access_token(now_unix(), TOKEN_REFRESH_MARGIN_SECS)
        {
            return Ok(token.to_string());
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we were waiting
        let credentials = CredentialSet::load(self.store.as_ref())?;
        if let Some(token) = credentials.usable_access_token(now_unix(), TOKEN_REFRESH_MARGIN_SECS)
        {
            return Ok(token.to_string());
        }

        tracing::info!(
            expires_at = credentials.expires_at,
            "Access token expired or missing, refreshing"
        );

        let tokens = self
            .client
            .refresh_token(
                &credentials.client_id,
                &credentials.client_secret,
                &credentials.refresh_token,
            )
            .await?;

        let rotated = tokens.refresh_token != credentials.refresh_token;
        self.persist(&tokens)?;

        tracing::info!(
            expires_at = tokens.expires_at,
            rotated,
            "Access token refreshed"
        );
        Ok(tokens.access_token)
    }

    /// One-time authorization-code exchange used during setup.
    ///
    /// The client id and secret are stored before the exchange so a failed
    /// exchange can be retried with only a new code.
    pub async fn exchange_authorization_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
    ) -> Result<(), AppError> {
        let client_id = client_id.trim();
        let client_secret = client_secret.trim();
        let code = code.trim();

        let missing: Vec<&str> = [
            (keys::CLIENT_ID, client_id),
            (keys::CLIENT_SECRET, client_secret),
            ("authorization code", code),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.is_empty().then_some(name))
        .collect();
        if !missing.is_empty() {
            return Err(AppError::Configuration(missing.join(", ")));
        }

        self.store.set(keys::CLIENT_ID, client_id)?;
        self.store.set(keys::CLIENT_SECRET, client_secret)?;

        let _guard = self.refresh_lock.lock().await;
        let tokens = self
            .client
            .exchange_code(client_id, client_secret, code)
            .await?;
        self.persist(&tokens)?;

        tracing::info!(expires_at = tokens.expires_at, "Authorization code exchanged");
        Ok(())
    }

    fn persist(&self, tokens: &TokenResponse) -> Result<(), AppError> {
        self.store.set(keys::ACCESS_TOKEN, &tokens.access_token)?;
        self.store.set(keys::REFRESH_TOKEN, &tokens.refresh_token)?;
        self.store
            .set(keys::EXPIRES_AT, &tokens.expires_at.to_string())?;
        Ok(())
    }
}
