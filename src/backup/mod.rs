mod logic;
pub(crate) mod archive; // Tarball creation
pub(crate) mod cleanup; // Output directory cleanup
pub(crate) mod content_type; // Leading-bytes MIME sniffing
pub(crate) mod db_dump; // Database enumeration and mongodump invocation
pub(crate) mod s3_upload; // Object storage upload

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::AppConfig;
use db_dump::{MongoDumpRunner, MongoLister};
use s3_upload::{ObjectStore, S3ObjectStore};

pub use logic::BackupPipeline;

/// Wires the production collaborators into a pipeline.
///
/// The object store is built once by the caller and shared for the process lifetime.
pub fn build_pipeline(app_config: &AppConfig, store: Arc<dyn ObjectStore>) -> Result<BackupPipeline> {
    let lister = MongoLister::new(app_config.mongo.clone());
    let dumper = MongoDumpRunner::new(app_config.mongo.clone(), app_config.mongodump_path.clone())
        .context("Failed to locate the dump tool")?;
    let archive_dir = std::env::current_dir().context("Failed to resolve working directory")?;

    Ok(BackupPipeline::new(
        Arc::new(lister),
        Arc::new(dumper),
        store,
        app_config.backup_output_dir.clone(),
        archive_dir,
    ))
}

/// Builds the S3 store from configuration.
pub async fn build_object_store(app_config: &AppConfig) -> Arc<dyn ObjectStore> {
    let client = s3_upload::build_s3_client(&app_config.storage).await;
    Arc::new(S3ObjectStore::new(client, app_config.storage.bucket_name.clone()))
}
