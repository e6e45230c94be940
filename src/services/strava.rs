// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client.
//!
//! Handles:
//! - OAuth token exchange and refresh
//! - Activity list, activity detail (splits), heart-rate streams, gear
//! - Rate limit backoff (HTTP 429) for GET calls
//!
//! Every call is awaited on its own and bounded by the client timeout.

use crate::config::Config;
use crate::error::AppError;
use crate::models::HeartRateStream;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Upper bound for a single rate-limit backoff.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    oauth_url: String,
    max_retries: u32,
    initial_backoff: Duration,
}

impl StravaClient {
    /// Create a client against the endpoints named in `config`.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.strava_api_url.trim_end_matches('/').to_string(),
            oauth_url: config.strava_oauth_url.trim_end_matches('/').to_string(),
            max_retries: config.rate_limit_max_retries,
            initial_backoff: config.rate_limit_backoff,
        })
    }

    // ─── OAuth ───────────────────────────────────────────────────────────────

    /// Exchange a one-time authorization code for tokens.
    pub async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
    ) -> Result<TokenResponse, AppError> {
        self.post_token(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, AppError> {
        self.post_token(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    /// POST to the token endpoint. Never retried; any failure is an auth error.
    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Strava token endpoint rejected request");
            return Err(AppError::Auth(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Failed to parse token response: {}", e)))
    }

    // ─── API ─────────────────────────────────────────────────────────────────

    /// List the athlete's most recent activities (single page).
    ///
    /// Failure here is fatal for an import, so every error maps to `Fetch`.
    pub async fn list_activities(
        &self,
        access_token: &str,
        per_page: u32,
    ) -> Result<Vec<StravaActivity>, AppError> {
        let url = format!("{}/athlete/activities", self.base_url);
        let per_page = per_page.to_string();

        self.get_json(&url, access_token, &[("per_page", per_page.as_str())])
            .await
            .map_err(|e| match e {
                AppError::StravaApi(msg) => AppError::Fetch(msg),
                other => other,
            })
    }

    /// Get a detailed activity (used for its metric splits).
    pub async fn get_activity_detail(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<ActivityDetail, AppError> {
        let url = format!("{}/activities/{}", self.base_url, activity_id);
        self.get_json(&url, access_token, &[]).await
    }

    /// Get the heart-rate and time streams of an activity.
    ///
    /// Returns `Ok(None)` when Strava has no heart-rate data for the activity.
    pub async fn get_heart_rate_stream(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<Option<HeartRateStream>, AppError> {
        let url = format!("{}/activities/{}/streams", self.base_url, activity_id);
        let streams: StreamSet = self
            .get_json(
                &url,
                access_token,
                &[("keys", "heartrate,time"), ("key_by_type", "true")],
            )
            .await?;

        Ok(streams.into_heart_rate_stream())
    }

    /// Get a gear record (name and lifetime distance).
    pub async fn get_gear(&self, access_token: &str, gear_id: &str) -> Result<StravaGear, AppError> {
        let url = format!("{}/gear/{}", self.base_url, gear_id);
        self.get_json(&url, access_token, &[]).await
    }

    /// Get authenticated athlete profile.
    pub async fn get_athlete(&self, access_token: &str) -> Result<StravaAthlete, AppError> {
        let url = format!("{}/athlete", self.base_url);
        self.get_json(&url, access_token, &[]).await
    }

    /// Generic GET request with JSON response and rate-limit backoff.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0;

        loop {
            let response = self
                .http
                .get(url)
                .bearer_auth(access_token)
                .query(query)
                .send()
                .await
                .map_err(|e| AppError::StravaApi(e.to_string()))?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS
                && attempt < self.max_retries
            {
                attempt += 1;
                tracing::warn!(
                    url,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "Strava rate limit hit (429), backing off"
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
                continue;
            }

            return self.check_response_json(response).await;
        }
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!("Strava rate limit persisted after retries");
                return Err(AppError::StravaApi(AppError::STRAVA_RATE_LIMIT.to_string()));
            }

            return Err(AppError::StravaApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
    }
}

/// Token response from the Strava OAuth endpoint (both grant types).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Summary activity from the list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StravaActivity {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub activity_type: String,
    pub sport_type: Option<String>,
    #[serde(default)]
    pub start_date: String,
    pub start_date_local: Option<String>,
    pub location_city: Option<String>,
    /// Distance in meters
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub moving_time: u64,
    #[serde(default)]
    pub elapsed_time: u64,
    #[serde(default)]
    pub total_elevation_gain: f64,
    pub elev_low: Option<f64>,
    pub elev_high: Option<f64>,
    /// Meters per second
    pub average_speed: Option<f64>,
    /// Meters per second
    pub max_speed: Option<f64>,
    #[serde(default)]
    pub has_heartrate: bool,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub start_latlng: Option<Vec<f64>>,
    pub end_latlng: Option<Vec<f64>>,
    pub map: Option<StravaMap>,
    pub gear_id: Option<String>,
}

impl StravaActivity {
    /// Get the summary polyline, if the activity has a route.
    pub fn summary_polyline(&self) -> Option<&str> {
        self.map
            .as_ref()
            .and_then(|m| m.summary_polyline.as_deref())
            .filter(|p| !p.is_empty())
    }
}

/// Activity map data with polylines.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StravaMap {
    pub summary_polyline: Option<String>,
}

/// Detailed activity; only the metric splits are used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityDetail {
    #[serde(default)]
    pub splits_metric: Vec<StravaSplit>,
}

/// One kilometer split.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StravaSplit {
    /// Seconds per kilometer
    pub pace: Option<f64>,
    /// Split distance in meters
    pub distance: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub elevation_difference: Option<f64>,
    pub moving_time: Option<u64>,
    pub elapsed_time: Option<u64>,
}

/// Streams response with `key_by_type=true`.
#[derive(Debug, Clone, Default, Deserialize)]
struct StreamSet {
    heartrate: Option<StreamData>,
    time: Option<StreamData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StreamData {
    #[serde(default)]
    data: Vec<Option<f64>>,
}

impl StreamSet {
    fn into_heart_rate_stream(self) -> Option<HeartRateStream> {
        let heart_rate: Vec<f64> = self
            .heartrate?
            .data
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();
        let time: Vec<f64> = self
            .time?
            .data
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();

        let stream = HeartRateStream::new(time, heart_rate);
        (!stream.is_empty()).then_some(stream)
    }
}

/// Gear record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StravaGear {
    pub name: Option<String>,
    /// Lifetime distance in meters
    pub distance: Option<f64>,
}

/// Athlete profile.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthlete {
    pub id: u64,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_deserializes_with_minimal_fields() {
        let json = r#"{"id": 1, "distance": 10000, "moving_time": 3000}"#;
        let activity: StravaActivity = serde_json::from_str(json).unwrap();
        assert_eq!(activity.id, 1);
        assert_eq!(activity.distance, 10000.0);
        assert_eq!(activity.moving_time, 3000);
        assert!(activity.gear_id.is_none());
        assert!(activity.summary_polyline().is_none());
    }

    #[test]
    fn test_stream_set_keyed_by_type() {
        let json = r#"{
            "heartrate": {"data": [120, 130, null], "series_type": "distance"},
            "time": {"data": [0, 1, 2]}
        }"#;
        let streams: StreamSet = serde_json::from_str(json).unwrap();
        let stream = streams.into_heart_rate_stream().unwrap();
        assert_eq!(stream.heart_rate, vec![120.0, 130.0, 0.0]);
        assert_eq!(stream.time, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_stream_set_without_heartrate() {
        let json = r#"{"time": {"data": [0, 1, 2]}}"#;
        let streams: StreamSet = serde_json::from_str(json).unwrap();
        assert!(streams.into_heart_rate_stream().is_none());
    }

    #[test]
    fn test_empty_polyline_is_no_route() {
        let json = r#"{"id": 7, "map": {"summary_polyline": ""}}"#;
        let activity: StravaActivity = serde_json::from_str(json).unwrap();
        assert!(activity.summary_polyline().is_none());
    }
}
