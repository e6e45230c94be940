// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-Ledger command line
//!
//! Runs imports, credential setup and route export against the tables and
//! credentials kept under `DATA_DIR`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use strava_ledger::{
    config::Config,
    db::{table_names, FileCredentialStore, JsonlTableStore, RunLock, TableSink},
    services::{export_routes, ImportPipeline},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "strava-ledger",
    about = "Append-only Strava activity history",
    long_about = "Imports recent Strava activities, enriches them with pace, heart-rate zones and gear mileage, and appends new rows to permanent history tables."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store app credentials and exchange a one-time authorization code
    Setup {
        #[arg(long)]
        client_id: String,

        #[arg(long)]
        client_secret: String,

        /// Code from the Strava authorization redirect
        #[arg(long)]
        code: String,
    },

    /// Fetch, enrich and reconcile recent activities
    Import,

    /// Check that the stored credentials still work
    TestToken,

    /// Write activity routes from the history table as GeoJSON
    ExportRoutes {
        #[arg(long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let credentials = Arc::new(FileCredentialStore::new(&config.data_dir)?);
    let tables = Arc::new(JsonlTableStore::new(&config.data_dir)?);

    match command {
        Command::Setup {
            client_id,
            client_secret,
            code,
        } => {
            let pipeline = ImportPipeline::new(&config, credentials, tables)?;
            pipeline.setup(&client_id, &client_secret, &code).await?;
            let athlete = pipeline.test_token().await?;
            println!("Setup complete. Connected as {} ({})", athlete.name, athlete.id);
        }
        Command::Import => {
            let _lock = RunLock::acquire(&config.data_dir)?;
            let pipeline = ImportPipeline::new(&config, credentials, tables)?;
            let report = pipeline.run_import().await?;

            println!(
                "Imported {} activities ({} new), {} splits ({} new) in {:.1}s",
                report.activities_fetched,
                report.activities_appended,
                report.splits_staged,
                report.splits_appended,
                report.elapsed.as_secs_f64()
            );
            for warning in &report.degraded {
                println!("  warning: {}", warning);
            }
        }
        Command::TestToken => {
            let pipeline = ImportPipeline::new(&config, credentials, tables)?;
            let athlete = pipeline.test_token().await?;
            println!("Token OK. Connected as {} ({})", athlete.name, athlete.id);
        }
        Command::ExportRoutes { output } => {
            let rows = tables.read_all_rows(table_names::ACTIVITIES)?;
            let collection = export_routes(&rows);
            std::fs::write(&output, serde_json::to_string_pretty(&collection)?)?;
            tracing::info!(path = %output.display(), "Route export written");
            println!(
                "Wrote {} activities to {}",
                collection.features.len(),
                output.display()
            );
        }
    }

    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true)
        .with_writer(std::io::stderr);

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["strava_ledger=debug", "info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
