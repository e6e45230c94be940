// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use serde_json::json;
use std::sync::Arc;
use strava_ledger::config::Config;
use strava_ledger::db::{CredentialStore, MemoryCredentialStore, MemoryTableStore};
use strava_ledger::models::credentials::keys;
use strava_ledger::services::ImportPipeline;
use strava_ledger::time_utils::now_unix;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Access token stored by `seeded_credentials` with a far-off expiry.
#[allow(dead_code)]
pub const CACHED_TOKEN: &str = "cached-access-token";

/// Config pointing both API and OAuth endpoints at the mock server.
#[allow(dead_code)]
pub fn test_config(server: &MockServer) -> Config {
    Config {
        max_heart_rate: 200.0,
        strava_api_url: format!("{}/api/v3", server.uri()),
        strava_oauth_url: format!("{}/oauth", server.uri()),
        ..Config::test_default()
    }
}

/// Credentials with a cached access token valid for another hour.
#[allow(dead_code)]
pub fn seeded_credentials() -> Arc<MemoryCredentialStore> {
    credentials_expiring_at(now_unix() + 3600)
}

#[allow(dead_code)]
pub fn credentials_expiring_at(expires_at: i64) -> Arc<MemoryCredentialStore> {
    let store = Arc::new(MemoryCredentialStore::new());
    store.set(keys::CLIENT_ID, "12345").unwrap();
    store.set(keys::CLIENT_SECRET, "client-secret").unwrap();
    store.set(keys::REFRESH_TOKEN, "old-refresh-token").unwrap();
    store.set(keys::ACCESS_TOKEN, CACHED_TOKEN).unwrap();
    store.set(keys::EXPIRES_AT, &expires_at.to_string()).unwrap();
    store
}

/// Pipeline over in-memory stores; returns the stores for assertions.
#[allow(dead_code)]
pub fn test_pipeline(
    server: &MockServer,
) -> (
    ImportPipeline,
    Arc<MemoryCredentialStore>,
    Arc<MemoryTableStore>,
) {
    let credentials = seeded_credentials();
    let tables = Arc::new(MemoryTableStore::new());
    let pipeline = ImportPipeline::new(&test_config(server), credentials.clone(), tables.clone())
        .expect("pipeline should build");
    (pipeline, credentials, tables)
}

/// Mount a 200 JSON response for `GET {route}`.
#[allow(dead_code)]
pub async fn mount_get(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount a status-only response for `GET {route}`.
#[allow(dead_code)]
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Detail response without splits.
#[allow(dead_code)]
pub fn no_splits() -> serde_json::Value {
    json!({ "splits_metric": [] })
}
