// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Enriched activity and split records, and their table row layout.

use crate::db::Row;
use crate::services::zones::{ZoneMinutes, ZONE_COUNT};

/// Activity table header. Permanent history inherits it verbatim.
pub const ACTIVITY_HEADER: [&str; 30] = [
    "id",
    "date",
    "type",
    "sport_type",
    "name",
    "city",
    "distance_km",
    "moving_time_min",
    "moving_time_sec",
    "elapsed_time_sec",
    "elevation_gain_m",
    "elev_low_m",
    "elev_high_m",
    "paceSecPerKm",
    "paceDisplay",
    "avg_speed_kmh",
    "max_speed_kmh",
    "avg_heartrate",
    "max_heartrate",
    "start_latlng",
    "end_latlng",
    "polyline",
    "gear_name",
    "gear_id",
    "gear_km_after_run",
    "Z1_min",
    "Z2_min",
    "Z3_min",
    "Z4_min",
    "Z5_min",
];

/// Identity key columns of the activity tables.
pub const ACTIVITY_KEY_COLUMNS: [usize; 1] = [0];

/// Split table header.
pub const SPLIT_HEADER: [&str; 9] = [
    "activity_id",
    "km",
    "pace_sec",
    "pace_mmss",
    "avg_hr",
    "max_hr",
    "elev_diff",
    "moving_time_sec",
    "elapsed_time_sec",
];

/// Identity key columns of the split tables: (activity id, split index).
pub const SPLIT_KEY_COLUMNS: [usize; 2] = [0, 1];

/// One activity with its derived metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedActivity {
    pub id: u64,
    /// Local start time, RFC 3339 when parseable
    pub date: String,
    pub activity_type: String,
    pub sport_type: String,
    pub name: String,
    pub city: String,
    pub distance_km: f64,
    pub moving_time_min: f64,
    pub moving_time_sec: u64,
    pub elapsed_time_sec: u64,
    pub elevation_gain_m: f64,
    pub elev_low_m: Option<f64>,
    pub elev_high_m: Option<f64>,
    /// 0 when the activity has no distance
    pub pace_sec_per_km: f64,
    pub pace_display: String,
    pub avg_speed_kmh: Option<f64>,
    pub max_speed_kmh: Option<f64>,
    pub avg_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub start_latlng: String,
    pub end_latlng: String,
    pub polyline: String,
    pub gear_name: String,
    pub gear_id: String,
    /// Estimated gear mileage including this activity (see `GearLedger`).
    ///
    /// Activities arrive newest first, so the ledger's "distance before the
    /// activities not yet processed" is the gear total right after this run.
    pub gear_km_after_run: Option<f64>,
    pub zone_minutes: ZoneMinutes,
}

impl EnrichedActivity {
    /// Table header for activity rows.
    pub fn header() -> Row {
        ACTIVITY_HEADER.iter().map(|c| c.to_string()).collect()
    }

    /// Cells in `ACTIVITY_HEADER` order.
    pub fn to_row(&self) -> Row {
        let mut row = vec![
            self.id.to_string(),
            self.date.clone(),
            self.activity_type.clone(),
            self.sport_type.clone(),
            self.name.clone(),
            self.city.clone(),
            number(self.distance_km),
            number(self.moving_time_min),
            self.moving_time_sec.to_string(),
            self.elapsed_time_sec.to_string(),
            number(self.elevation_gain_m),
            optional(self.elev_low_m),
            optional(self.elev_high_m),
            number(self.pace_sec_per_km),
            self.pace_display.clone(),
            optional(self.avg_speed_kmh),
            optional(self.max_speed_kmh),
            optional(self.avg_heartrate),
            optional(self.max_heartrate),
            self.start_latlng.clone(),
            self.end_latlng.clone(),
            self.polyline.clone(),
            self.gear_name.clone(),
            self.gear_id.clone(),
            optional(self.gear_km_after_run),
        ];
        row.extend((0..ZONE_COUNT).map(|zone| optional(self.zone_minutes.get(zone))));
        row
    }
}

/// One metric split of an activity.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRecord {
    pub activity_id: u64,
    /// 1-based split index
    pub index: u32,
    pub pace_sec: Option<f64>,
    pub pace_display: String,
    pub avg_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub elevation_difference: f64,
    pub moving_time_sec: Option<u64>,
    pub elapsed_time_sec: Option<u64>,
}

impl SplitRecord {
    /// Table header for split rows.
    pub fn header() -> Row {
        SPLIT_HEADER.iter().map(|c| c.to_string()).collect()
    }

    /// Cells in `SPLIT_HEADER` order.
    pub fn to_row(&self) -> Row {
        vec![
            self.activity_id.to_string(),
            self.index.to_string(),
            optional(self.pace_sec),
            self.pace_display.clone(),
            optional(self.avg_heartrate),
            optional(self.max_heartrate),
            number(self.elevation_difference),
            self.moving_time_sec.map(|t| t.to_string()).unwrap_or_default(),
            self.elapsed_time_sec
                .map(|t| t.to_string())
                .unwrap_or_default(),
        ]
    }
}

/// Shortest round-trip text for a number (`10`, `2.5`).
fn number(value: f64) -> String {
    value.to_string()
}

fn optional(value: Option<f64>) -> String {
    value.map(number).unwrap_or_default()
}
