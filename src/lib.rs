// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava-Ledger: Keep an append-only history of Strava activities
//!
//! This crate pulls recent activities from Strava, enriches them with pace,
//! heart-rate zone minutes and estimated gear mileage, and reconciles them
//! into permanent history tables without duplicates.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;

pub use config::Config;
pub use error::AppError;
