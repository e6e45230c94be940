// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Heart-rate time series for a single activity.

/// Parallel heart-rate and elapsed-time samples, in recording order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeartRateStream {
    /// Elapsed seconds since activity start, one per sample
    pub time: Vec<f64>,
    /// Heart rate in bpm, one per sample
    pub heart_rate: Vec<f64>,
}

impl HeartRateStream {
    pub fn new(time: Vec<f64>, heart_rate: Vec<f64>) -> Self {
        Self { time, heart_rate }
    }

    /// True when either series carries no samples.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty() || self.heart_rate.is_empty()
    }

    /// Iterate `(elapsed_secs, bpm)` pairs; a trailing unmatched sample is ignored.
    pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time
            .iter()
            .copied()
            .zip(self.heart_rate.iter().copied())
    }
}
