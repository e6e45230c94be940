// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-batch equipment mileage attribution.
//!
//! Strava only reports a gear's lifetime distance as of now, never its value
//! at the time of a past activity. The ledger back-computes an approximation:
//! the first activity of the batch that uses a gear reports the current
//! lifetime total, and every later activity using the same gear reports that
//! total minus the distance of the batch activities already processed. The
//! result is an estimate, not an odometer reading.
//!
//! The ledger is only meaningful when activities are fed in the fixed order
//! of the batch; it is built once per import and discarded afterwards.

use std::collections::HashMap;

/// Gear totals as reported by Strava at import time.
#[derive(Debug, Clone, PartialEq)]
pub struct GearTotal {
    pub name: String,
    /// Lifetime distance in kilometers
    pub lifetime_km: f64,
}

/// Gear fields attributed to one activity.
#[derive(Debug, Clone, PartialEq)]
pub struct GearReading {
    pub name: String,
    /// Estimated gear distance before this activity, in kilometers
    pub distance_before_km: f64,
}

#[derive(Debug, Clone)]
struct LedgerEntry {
    total: GearTotal,
    consumed_km: f64,
}

/// Stateful accumulator threaded through one processing batch.
#[derive(Debug, Default)]
pub struct GearLedger {
    entries: HashMap<String, LedgerEntry>,
}

impl GearLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the current lifetime total for a gear. Re-seeding resets it.
    pub fn seed(&mut self, gear_id: impl Into<String>, total: GearTotal) {
        self.entries.insert(
            gear_id.into(),
            LedgerEntry {
                total,
                consumed_km: 0.0,
            },
        );
    }

    /// Report the estimated distance before this activity, then consume it.
    ///
    /// Returns `None` for activities without gear or whose gear has no
    /// Strava record; those produce empty gear fields rather than an error.
    pub fn consume_and_report(
        &mut self,
        gear_id: Option<&str>,
        activity_distance_km: f64,
    ) -> Option<GearReading> {
        let entry = self.entries.get_mut(gear_id.filter(|id| !id.is_empty())?)?;

        let reading = GearReading {
            name: entry.total.name.clone(),
            distance_before_km: entry.total.lifetime_km - entry.consumed_km,
        };
        entry.consumed_km += activity_distance_km;

        Some(reading)
    }
}
