// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Heart-rate zone aggregation.
//!
//! Turns a heart-rate/time stream into seconds (and minutes) spent in each of
//! five zones. Zones are fractions of a configured maximum heart rate.

use crate::models::HeartRateStream;

/// Number of heart-rate zones (Z1..Z5).
pub const ZONE_COUNT: usize = 5;

/// Ordered, contiguous zone bounds as fractions of max heart rate.
///
/// Zone `i` covers `[lower[i], lower[i + 1])`; Z5 ends at 1.0. Ratios below
/// Z1's lower bound belong to no zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneBounds {
    lower: [f64; ZONE_COUNT],
}

impl Default for ZoneBounds {
    fn default() -> Self {
        Self {
            lower: [0.50, 0.60, 0.70, 0.80, 0.90],
        }
    }
}

impl ZoneBounds {
    /// Build bounds from the five lower bounds, Z1 first.
    pub fn from_lower_bounds(lower: [f64; ZONE_COUNT]) -> Result<Self, String> {
        if lower.iter().any(|b| !(0.0..1.0).contains(b)) {
            return Err("bounds must be within [0, 1)".to_string());
        }
        if lower.windows(2).any(|w| w[0] >= w[1]) {
            return Err("bounds must be strictly ascending".to_string());
        }
        Ok(Self { lower })
    }

    /// Zone index for a heart-rate fraction, checking Z5 first.
    pub fn classify(&self, ratio: f64) -> Option<usize> {
        (0..ZONE_COUNT).rev().find(|&zone| ratio >= self.lower[zone])
    }
}

/// Minutes per zone, or no data at all.
///
/// "No data" is distinct from zero: zero minutes means heart rate was
/// recorded but never reached that zone.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ZoneMinutes(Option<[f64; ZONE_COUNT]>);

impl ZoneMinutes {
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Minutes for zone index `zone` (0 = Z1), `None` when there is no data.
    pub fn get(&self, zone: usize) -> Option<f64> {
        self.0.map(|minutes| minutes[zone])
    }

    pub fn as_array(&self) -> Option<[f64; ZONE_COUNT]> {
        self.0
    }
}

/// Aggregates heart-rate samples into per-zone time.
#[derive(Debug, Clone)]
pub struct ZoneAggregator {
    bounds: ZoneBounds,
    first_sample_interval_secs: f64,
}

impl ZoneAggregator {
    pub fn new(bounds: ZoneBounds, first_sample_interval_secs: f64) -> Self {
        Self {
            bounds,
            first_sample_interval_secs,
        }
    }

    /// Seconds spent in each zone, or `None` when the stream carries no data.
    ///
    /// Sample `i` is credited with `time[i] - time[i - 1]`; the first sample
    /// gets the configured first-sample interval. Samples at or below 0 bpm
    /// are dropped together with their interval. Backwards time steps count
    /// as zero.
    pub fn zone_seconds(
        &self,
        stream: Option<&HeartRateStream>,
        max_heart_rate: f64,
    ) -> Option<[f64; ZONE_COUNT]> {
        let stream = stream.filter(|s| !s.is_empty())?;
        if max_heart_rate <= 0.0 {
            return None;
        }

        let mut seconds = [0.0; ZONE_COUNT];
        let mut previous_time: Option<f64> = None;

        for (time, hr) in stream.samples() {
            let interval = match previous_time {
                Some(prev) => (time - prev).max(0.0),
                None => self.first_sample_interval_secs,
            };
            previous_time = Some(time);

            if hr.is_nan() || hr <= 0.0 {
                continue;
            }

            if let Some(zone) = self.bounds.classify(hr / max_heart_rate) {
                seconds[zone] += interval;
            }
        }

        Some(seconds)
    }

    /// Minutes per zone, rounded to one decimal place.
    pub fn compute_zone_minutes(
        &self,
        stream: Option<&HeartRateStream>,
        max_heart_rate: f64,
    ) -> ZoneMinutes {
        ZoneMinutes(
            self.zone_seconds(stream, max_heart_rate)
                .map(|seconds| seconds.map(|s| round_tenths(s / 60.0))),
        )
    }
}

/// Round half away from zero at the tenths digit.
fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
