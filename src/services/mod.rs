// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod gear;
pub mod import;
pub mod routes_export;
pub mod strava;
pub mod sync;
pub mod tokens;
pub mod zones;

pub use activity::ActivityEnricher;
pub use gear::{GearLedger, GearReading, GearTotal};
pub use import::{AthleteSummary, ImportPipeline, ImportReport};
pub use routes_export::export_routes;
pub use strava::StravaClient;
pub use sync::{merge_append_only, select_new_rows};
pub use tokens::TokenManager;
pub use zones::{ZoneAggregator, ZoneBounds, ZoneMinutes};
