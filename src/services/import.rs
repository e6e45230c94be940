// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Import pipeline: fetch, enrich, stage, then reconcile into history.
//!
//! A run is one sequential pass. Fatal errors (credentials, token, activity
//! list, storage) abort before the staging tables are touched, so history is
//! only ever extended by complete batches. Failed stream, splits and gear
//! lookups are recorded in the report and leave the affected fields empty.

use crate::config::Config;
use crate::db::{table_names, CredentialStore, Row, TableSink};
use crate::error::AppError;
use crate::models::activity::{ACTIVITY_KEY_COLUMNS, SPLIT_KEY_COLUMNS};
use crate::models::{EnrichedActivity, SplitRecord};
use crate::services::activity::ActivityEnricher;
use crate::services::gear::{GearLedger, GearTotal};
use crate::services::strava::{StravaActivity, StravaClient};
use crate::services::sync::merge_append_only;
use crate::services::tokens::TokenManager;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Outcome of one import run.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub activities_fetched: usize,
    pub splits_staged: usize,
    pub activities_appended: usize,
    pub splits_appended: usize,
    /// Human-readable description of every degraded lookup
    pub degraded: Vec<String>,
    pub elapsed: Duration,
}

/// Authenticated athlete, as shown by the token test.
#[derive(Debug, Clone, PartialEq)]
pub struct AthleteSummary {
    pub id: u64,
    pub name: String,
}

/// Wires the token manager, Strava client and table sink into one import.
pub struct ImportPipeline {
    tokens: TokenManager,
    client: StravaClient,
    sink: Arc<dyn TableSink>,
    enricher: ActivityEnricher,
    per_page: u32,
    /// Serializes runs within this process
    run_lock: Mutex<()>,
}

impl ImportPipeline {
    pub fn new(
        config: &Config,
        credentials: Arc<dyn CredentialStore>,
        sink: Arc<dyn TableSink>,
    ) -> Result<Self, AppError> {
        let client = StravaClient::new(config)?;
        Ok(Self {
            tokens: TokenManager::new(credentials, client.clone()),
            client,
            sink,
            enricher: ActivityEnricher::from_config(config),
            per_page: config.per_page,
            run_lock: Mutex::new(()),
        })
    }

    /// Run a full import.
    pub async fn run_import(&self) -> Result<ImportReport, AppError> {
        let _guard = self.run_lock.lock().await;
        let started = Instant::now();
        let mut report = ImportReport::default();

        let access_token = self.tokens.get_valid_access_token().await?;
        let activities = self
            .client
            .list_activities(&access_token, self.per_page)
            .await?;
        report.activities_fetched = activities.len();
        tracing::info!(count = activities.len(), "Fetched activity list");

        let mut ledger = self
            .seed_gear_ledger(&access_token, &activities, &mut report.degraded)
            .await;

        let mut activity_rows: Vec<Row> = Vec::with_capacity(activities.len());
        let mut split_rows: Vec<Row> = Vec::new();

        for activity in &activities {
            let stream = match self
                .client
                .get_heart_rate_stream(&access_token, activity.id)
                .await
            {
                Ok(stream) => stream,
                Err(e) => {
                    record_degraded(
                        &mut report.degraded,
                        format!("heart-rate stream of activity {}", activity.id),
                        e,
                    );
                    None
                }
            };

            let gear =
                ledger.consume_and_report(activity.gear_id.as_deref(), activity.distance / 1000.0);
            let record = self.enricher.enrich(activity, stream.as_ref(), gear);
            activity_rows.push(record.to_row());

            match self
                .client
                .get_activity_detail(&access_token, activity.id)
                .await
            {
                Ok(detail) => {
                    let splits = self.enricher.splits(activity.id, &detail);
                    split_rows.extend(splits.iter().map(SplitRecord::to_row));
                }
                Err(e) => record_degraded(
                    &mut report.degraded,
                    format!("splits of activity {}", activity.id),
                    e,
                ),
            }

            tracing::debug!(activity_id = activity.id, "Activity staged in memory");
        }
        report.splits_staged = split_rows.len();

        self.replace_table(
            table_names::STAGING_ACTIVITIES,
            EnrichedActivity::header(),
            &activity_rows,
        )?;
        self.replace_table(table_names::STAGING_SPLITS, SplitRecord::header(), &split_rows)?;

        report.activities_appended = merge_append_only(
            self.sink.as_ref(),
            table_names::STAGING_ACTIVITIES,
            table_names::ACTIVITIES,
            &ACTIVITY_KEY_COLUMNS,
        )?;
        report.splits_appended = merge_append_only(
            self.sink.as_ref(),
            table_names::STAGING_SPLITS,
            table_names::SPLITS,
            &SPLIT_KEY_COLUMNS,
        )?;

        report.elapsed = started.elapsed();
        tracing::info!(
            fetched = report.activities_fetched,
            splits = report.splits_staged,
            activities_appended = report.activities_appended,
            splits_appended = report.splits_appended,
            degraded = report.degraded.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Import complete"
        );
        Ok(report)
    }

    /// Verify the stored credentials by fetching the athlete profile.
    pub async fn test_token(&self) -> Result<AthleteSummary, AppError> {
        let access_token = self.tokens.get_valid_access_token().await?;
        let athlete = self.client.get_athlete(&access_token).await?;

        let name = format!("{} {}", athlete.firstname, athlete.lastname)
            .trim()
            .to_string();
        tracing::info!(athlete_id = athlete.id, "Token test succeeded");
        Ok(AthleteSummary {
            id: athlete.id,
            name,
        })
    }

    /// Store the app credentials and exchange a one-time authorization code.
    pub async fn setup(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
    ) -> Result<(), AppError> {
        self.tokens
            .exchange_authorization_code(client_id, client_secret, code)
            .await
    }

    /// Look up each distinct gear once, in first-seen order.
    async fn seed_gear_ledger(
        &self,
        access_token: &str,
        activities: &[StravaActivity],
        degraded: &mut Vec<String>,
    ) -> GearLedger {
        let mut ledger = GearLedger::new();
        let mut seen = HashSet::new();

        let gear_ids = activities
            .iter()
            .filter_map(|a| a.gear_id.as_deref())
            .filter(|id| !id.is_empty());

        for gear_id in gear_ids {
            if !seen.insert(gear_id) {
                continue;
            }

            match self.client.get_gear(access_token, gear_id).await {
                Ok(gear) => {
                    let total = GearTotal {
                        // Unnamed gear is shown by its id
                        name: gear
                            .name
                            .filter(|n| !n.trim().is_empty())
                            .unwrap_or_else(|| gear_id.to_string()),
                        lifetime_km: gear.distance.unwrap_or(0.0) / 1000.0,
                    };
                    tracing::debug!(gear_id, lifetime_km = total.lifetime_km, "Gear seeded");
                    ledger.seed(gear_id, total);
                }
                Err(e) => record_degraded(degraded, format!("gear {}", gear_id), e),
            }
        }

        ledger
    }

    /// Replace a staging table with `header` followed by `rows`.
    fn replace_table(&self, table: &str, header: Row, rows: &[Row]) -> Result<(), AppError> {
        if self.sink.table_exists(table)? {
            self.sink.clear_all_rows(table)?;
        } else {
            self.sink.create_table(table)?;
        }
        self.sink.append_row(table, &header)?;
        self.sink.append_rows(table, rows)?;

        tracing::debug!(table, rows = rows.len(), "Staging table replaced");
        Ok(())
    }
}

fn record_degraded(degraded: &mut Vec<String>, resource: String, cause: AppError) {
    let rate_limited = cause.is_rate_limited();
    let err = AppError::degrade(resource, cause);
    tracing::warn!(error = %err, rate_limited, "Continuing without optional data");
    degraded.push(err.to_string());
}
