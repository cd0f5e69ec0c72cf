//! MongoDB Backup Service
//!
//! Dumps every user database nightly, archives the dumps, uploads the archive to
//! object storage and serves a liveness endpoint.

// mongobackup/src/main.rs
mod backup;
mod config;
mod errors;
mod scheduler;
mod server;
mod utils;

use anyhow::{Context, Result};
use chrono::Local;
use config::AppConfig;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the backup service
#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run_app().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    let config_path = PathBuf::from("config.json");
    let app_config = AppConfig::load(&config_path)
        .context("Failed to load application configuration")?;

    let store = backup::build_object_store(&app_config).await;
    let pipeline = Arc::new(
        backup::build_pipeline(&app_config, store).context("Failed to set up backup pipeline")?,
    );

    let choice = env::args().nth(1).map(|a| a.trim().to_string());
    match choice.as_deref() {
        None | Some("serve") => {
            scheduler::spawn_daily(pipeline, scheduler::DAILY_RUN_AT);
            server::serve(app_config.app_port).await
        }
        Some("backup") => {
            tracing::info!("🚀 Starting one-off backup run...");
            let report = pipeline
                .run(Local::now().date_naive())
                .await
                .context("Backup process failed")?;
            tracing::info!(
                key = %report.upload.key,
                failed = ?report.failed_databases(),
                "✅ Operation completed successfully."
            );
            Ok(())
        }
        Some(other) => {
            anyhow::bail!("Invalid operation '{}'. Use 'serve' (default) or 'backup'.", other)
        }
    }
}
