// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth credential set.

use crate::db::CredentialStore;
use crate::error::AppError;

/// Credential store key names.
pub mod keys {
    pub const CLIENT_ID: &str = "STRAVA_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "STRAVA_CLIENT_SECRET";
    pub const REFRESH_TOKEN: &str = "STRAVA_REFRESH_TOKEN";
    pub const ACCESS_TOKEN: &str = "STRAVA_ACCESS_TOKEN";
    pub const EXPIRES_AT: &str = "STRAVA_EXPIRES_AT";
}

/// The athlete's OAuth credentials, read from the store once per use.
#[derive(Clone)]
pub struct CredentialSet {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Cached access token, if one was ever issued
    pub access_token: Option<String>,
    /// Access token expiry (Unix seconds)
    pub expires_at: Option<i64>,
}

impl CredentialSet {
    /// Read the credential set, failing when any long-lived secret is missing.
    pub fn load(store: &dyn CredentialStore) -> Result<Self, AppError> {
        let client_id = non_empty(store.get(keys::CLIENT_ID)?);
        let client_secret = non_empty(store.get(keys::CLIENT_SECRET)?);
        let refresh_token = non_empty(store.get(keys::REFRESH_TOKEN)?);

        let missing: Vec<&str> = [
            (keys::CLIENT_ID, client_id.is_none()),
            (keys::CLIENT_SECRET, client_secret.is_none()),
            (keys::REFRESH_TOKEN, refresh_token.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (Some(client_id), Some(client_secret), Some(refresh_token)) =
            (client_id, client_secret, refresh_token)
        else {
            return Err(AppError::Configuration(missing.join(", ")));
        };

        let access_token = non_empty(store.get(keys::ACCESS_TOKEN)?);
        let expires_at = non_empty(store.get(keys::EXPIRES_AT)?).and_then(|v| v.parse().ok());

        Ok(Self {
            client_id,
            client_secret,
            refresh_token,
            access_token,
            expires_at,
        })
    }

    /// The cached access token, if it stays valid beyond `now + margin_secs`.
    pub fn usable_access_token(&self, now: i64, margin_secs: i64) -> Option<&str> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(expires_at)) if expires_at > now + margin_secs => Some(token),
            _ => None,
        }
    }
}

impl std::fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSet")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
