// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity enrichment.
//!
//! Pure transforms from Strava payloads to table records:
//! 1. Pace and speed conversions
//! 2. Heart-rate zone minutes
//! 3. Gear name and estimated mileage
//! 4. Location fields, only when location sharing is enabled

use crate::config::Config;
use crate::models::{EnrichedActivity, HeartRateStream, SplitRecord};
use crate::services::gear::GearReading;
use crate::services::strava::{ActivityDetail, StravaActivity, StravaSplit};
use crate::services::zones::ZoneAggregator;
use crate::time_utils::normalize_timestamp;

/// Meters per second to kilometers per hour.
const MPS_TO_KMH: f64 = 3.6;

/// Builds enriched records from raw activities.
#[derive(Debug, Clone)]
pub struct ActivityEnricher {
    zones: ZoneAggregator,
    max_heart_rate: f64,
    include_location_data: bool,
}

impl ActivityEnricher {
    pub fn new(zones: ZoneAggregator, max_heart_rate: f64, include_location_data: bool) -> Self {
        Self {
            zones,
            max_heart_rate,
            include_location_data,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ZoneAggregator::new(config.zone_bounds, config.first_sample_interval_secs),
            config.max_heart_rate,
            config.include_location_data,
        )
    }

    /// Combine an activity, its optional stream and its gear reading.
    pub fn enrich(
        &self,
        activity: &StravaActivity,
        stream: Option<&HeartRateStream>,
        gear: Option<GearReading>,
    ) -> EnrichedActivity {
        let distance_km = activity.distance / 1000.0;
        let pace_sec_per_km = pace_seconds_per_km(activity.moving_time as f64, distance_km);

        let date = activity
            .start_date_local
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(&activity.start_date);

        let (gear_name, gear_km_after_run) = match gear {
            Some(reading) => (reading.name, Some(reading.distance_before_km)),
            None => (String::new(), None),
        };

        EnrichedActivity {
            id: activity.id,
            date: normalize_timestamp(date),
            activity_type: activity.activity_type.clone(),
            sport_type: activity.sport_type.clone().unwrap_or_default(),
            name: activity.name.clone(),
            city: activity.location_city.clone().unwrap_or_default(),
            distance_km,
            moving_time_min: activity.moving_time as f64 / 60.0,
            moving_time_sec: activity.moving_time,
            elapsed_time_sec: activity.elapsed_time,
            elevation_gain_m: activity.total_elevation_gain,
            elev_low_m: activity.elev_low,
            elev_high_m: activity.elev_high,
            pace_sec_per_km,
            pace_display: format_pace(pace_sec_per_km),
            avg_speed_kmh: speed_kmh(activity.average_speed),
            max_speed_kmh: speed_kmh(activity.max_speed),
            avg_heartrate: activity
                .average_heartrate
                .filter(|_| activity.has_heartrate),
            max_heartrate: activity.max_heartrate.filter(|_| activity.has_heartrate),
            start_latlng: self.location(activity.start_latlng.as_deref()),
            end_latlng: self.location(activity.end_latlng.as_deref()),
            polyline: if self.include_location_data {
                activity.summary_polyline().unwrap_or_default().to_string()
            } else {
                String::new()
            },
            gear_name,
            gear_id: activity.gear_id.clone().unwrap_or_default(),
            gear_km_after_run,
            zone_minutes: self.zones.compute_zone_minutes(stream, self.max_heart_rate),
        }
    }

    /// Split records of one activity, numbered from 1.
    pub fn splits(&self, activity_id: u64, detail: &ActivityDetail) -> Vec<SplitRecord> {
        detail
            .splits_metric
            .iter()
            .enumerate()
            .map(|(index, split)| split_record(activity_id, index as u32 + 1, split))
            .collect()
    }

    /// `lat,lng` when location sharing is enabled and the pair is complete.
    fn location(&self, latlng: Option<&[f64]>) -> String {
        match latlng {
            Some([lat, lng]) if self.include_location_data => format!("{},{}", lat, lng),
            _ => String::new(),
        }
    }
}

fn split_record(activity_id: u64, index: u32, split: &StravaSplit) -> SplitRecord {
    let pace_sec = split.pace.filter(|p| *p > 0.0).or_else(|| {
        let distance_km = split.distance? / 1000.0;
        let moving_time = split.moving_time? as f64;
        (distance_km > 0.0).then(|| moving_time / distance_km)
    });

    SplitRecord {
        activity_id,
        index,
        pace_sec,
        pace_display: pace_sec.map(format_pace).unwrap_or_default(),
        avg_heartrate: split.average_heartrate.filter(|hr| *hr > 0.0),
        max_heartrate: split.max_heartrate.filter(|hr| *hr > 0.0),
        elevation_difference: split.elevation_difference.unwrap_or(0.0),
        moving_time_sec: split.moving_time.filter(|t| *t > 0),
        elapsed_time_sec: split.elapsed_time.filter(|t| *t > 0),
    }
}

/// Moving seconds per kilometer; 0 when there is no distance.
///
/// Callers tell "no pace" apart from a real value by checking distance first.
pub fn pace_seconds_per_km(moving_time_secs: f64, distance_km: f64) -> f64 {
    if distance_km > 0.0 {
        moving_time_secs / distance_km
    } else {
        0.0
    }
}

/// Format seconds per kilometer as zero-padded `mm:ss`.
///
/// Non-positive paces format as an empty string.
pub fn format_pace(seconds_per_km: f64) -> String {
    if seconds_per_km.is_nan() || seconds_per_km <= 0.0 {
        return String::new();
    }
    let total = seconds_per_km.round() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn speed_kmh(meters_per_second: Option<f64>) -> Option<f64> {
    meters_per_second
        .filter(|v| *v > 0.0)
        .map(|v| v * MPS_TO_KMH)
}
