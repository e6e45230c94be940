//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup. A `.env` file in the working directory is
//! honoured for local use.

use crate::services::zones::ZoneBounds;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Strava allows at most 200 activities per list page.
pub const MAX_PER_PAGE: u32 = 200;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Athlete profile ---
    /// Maximum heart rate used to turn bpm into zone fractions
    pub max_heart_rate: f64,
    /// Heart-rate zone bounds as fractions of `max_heart_rate`
    pub zone_bounds: ZoneBounds,
    /// Seconds credited to the first sample of a heart-rate stream
    pub first_sample_interval_secs: f64,
    /// Emit coordinates and route polylines (off unless explicitly enabled)
    pub include_location_data: bool,

    // --- Import ---
    /// Activities requested per list call
    pub per_page: u32,
    /// Directory for credentials, tables and the run lock
    pub data_dir: PathBuf,

    // --- Strava endpoints ---
    pub strava_api_url: String,
    pub strava_oauth_url: String,
    /// Deadline applied to every outbound request
    pub http_timeout: Duration,
    /// Retries after HTTP 429 on GET calls
    pub rate_limit_max_retries: u32,
    /// First 429 backoff delay (doubled per retry)
    pub rate_limit_backoff: Duration,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            max_heart_rate: 190.0,
            zone_bounds: ZoneBounds::default(),
            first_sample_interval_secs: 1.0,
            include_location_data: false,
            per_page: 50,
            data_dir: PathBuf::from("data"),
            strava_api_url: "http://localhost:9999/api/v3".to_string(),
            strava_oauth_url: "http://localhost:9999/oauth".to_string(),
            http_timeout: Duration::from_secs(5),
            rate_limit_max_retries: 3,
            rate_limit_backoff: Duration::from_millis(1),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let max_heart_rate: f64 = env::var("MAX_HEART_RATE")
            .map_err(|_| ConfigError::Missing("MAX_HEART_RATE"))?
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid("MAX_HEART_RATE", "not a number"))?;
        if !(max_heart_rate.is_finite() && max_heart_rate > 0.0) {
            return Err(ConfigError::invalid("MAX_HEART_RATE", "must be positive"));
        }

        let zone_bounds = match env::var("HR_ZONE_BOUNDS") {
            Ok(raw) => parse_zone_bounds(&raw)?,
            Err(_) => ZoneBounds::default(),
        };

        let first_sample_interval_secs: f64 = parse_or("FIRST_SAMPLE_INTERVAL_SECS", 1.0)?;
        if first_sample_interval_secs < 0.0 {
            return Err(ConfigError::invalid(
                "FIRST_SAMPLE_INTERVAL_SECS",
                "must not be negative",
            ));
        }

        Ok(Self {
            max_heart_rate,
            zone_bounds,
            first_sample_interval_secs,
            include_location_data: parse_bool("INCLUDE_LOCATION_DATA")?,
            per_page: parse_or::<u32>("PER_PAGE", 50)?.clamp(1, MAX_PER_PAGE),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            strava_api_url: env::var("STRAVA_API_URL")
                .unwrap_or_else(|_| "https://www.strava.com/api/v3".to_string()),
            strava_oauth_url: env::var("STRAVA_OAUTH_URL")
                .unwrap_or_else(|_| "https://www.strava.com/oauth".to_string()),
            http_timeout: Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", 30)?),
            rate_limit_max_retries: parse_or("RATE_LIMIT_MAX_RETRIES", 3)?,
            rate_limit_backoff: Duration::from_millis(parse_or("RATE_LIMIT_BACKOFF_MS", 1000)?),
        })
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset.
fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid(name, "not a valid number")),
        Err(_) => Ok(default),
    }
}

fn parse_bool(name: &'static str) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::invalid(name, "expected true or false")),
        },
        Err(_) => Ok(false),
    }
}

/// Parse `HR_ZONE_BOUNDS`: five comma-separated lower bounds, Z1 first.
fn parse_zone_bounds(raw: &str) -> Result<ZoneBounds, ConfigError> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| ConfigError::invalid("HR_ZONE_BOUNDS", "not a list of numbers"))?;

    let lower: [f64; 5] = values
        .try_into()
        .map_err(|_| ConfigError::invalid("HR_ZONE_BOUNDS", "expected exactly 5 values"))?;

    ZoneBounds::from_lower_bounds(lower).map_err(|reason| ConfigError::Invalid {
        name: "HR_ZONE_BOUNDS",
        reason,
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: &str) -> Self {
        ConfigError::Invalid {
            name,
            reason: reason.to_string(),
        }
    }
}
