// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types.
//!
//! Every variant except [`AppError::DegradedData`] aborts an import run.

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing Strava credentials ({0}). Run setup first.")]
    Configuration(String),

    #[error("Strava authorization failed: {0}")]
    Auth(String),

    #[error("Failed to fetch activities: {0}")]
    Fetch(String),

    #[error("Incomplete data for {resource}: {reason}")]
    DegradedData { resource: String, reason: String },

    #[error("Strava API error: {0}")]
    StravaApi(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Marker text used when Strava keeps answering 429 after all retries.
    pub const STRAVA_RATE_LIMIT: &'static str = "Strava rate limit exceeded";

    /// Whether this error must abort the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AppError::DegradedData { .. })
    }

    /// Check if this is a rate limit error from Strava.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppError::StravaApi(msg) if msg.contains(Self::STRAVA_RATE_LIMIT))
    }

    /// Downgrade a failed optional fetch into a non-fatal record.
    pub fn degrade(resource: impl Into<String>, cause: AppError) -> Self {
        AppError::DegradedData {
            resource: resource.into(),
            reason: cause.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(format!("Malformed stored JSON: {}", err))
    }
}
