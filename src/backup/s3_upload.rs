// mongobackup/src/backup/s3_upload.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::primitives::ByteStream;
use std::io::{ErrorKind, SeekFrom};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{info, warn};

use super::content_type::{SNIFF_LEN, detect_content_type};
use crate::config::StorageConfig;
use crate::errors::BackupError;

/// Destination bucket for finished archives.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `body` from its current position to the end under `key`.
    async fn put_object(&self, key: &str, content_type: &str, body: File) -> Result<()>;

    /// Human-readable location used in log lines.
    fn describe(&self) -> String;
}

/// Builds the S3 client once at startup from static credentials.
pub async fn build_s3_client(storage: &StorageConfig) -> s3::Client {
    let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
        .region(Region::new(storage.region.clone()))
        .credentials_provider(s3::config::Credentials::new(
            &storage.access_key_id,
            &storage.secret_access_key,
            None,     // session_token
            None,     // expiry
            "Static", // provider_name
        ));
    if let Some(endpoint) = &storage.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;
    s3::Client::new(&sdk_config)
}

/// S3 (or S3-compatible) bucket behind an injected client.
pub struct S3ObjectStore {
    client: s3::Client,
    bucket_name: String,
}

impl S3ObjectStore {
    pub fn new(client: s3::Client, bucket_name: impl Into<String>) -> Self {
        Self {
            client,
            bucket_name: bucket_name.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, content_type: &str, body: File) -> Result<()> {
        let body = ByteStream::read_from()
            .file(body)
            .build()
            .await
            .with_context(|| format!("Failed to create ByteStream for key {}", key))?;

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to upload to S3 bucket {} with key {}",
                    self.bucket_name, key
                )
            })?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("s3://{}", self.bucket_name)
    }
}

/// What a successful upload stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub key: String,
    pub content_type: String,
}

/// Uploads the archive under its file name, then deletes the local copy.
///
/// A local file that is already gone after the upload is only a warning.
pub async fn upload_archive(
    store: &dyn ObjectStore,
    archive_path: &Path,
) -> crate::errors::Result<UploadReceipt> {
    let receipt = put_archive(store, archive_path)
        .await
        .map_err(BackupError::Upload)?;

    info!(
        key = %receipt.key,
        destination = %store.describe(),
        content_type = %receipt.content_type,
        "✅ Backup uploaded successfully"
    );

    match tokio::fs::remove_file(archive_path).await {
        Ok(()) => info!(path = %archive_path.display(), "Local archive removed"),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %archive_path.display(), "Local archive not found after upload")
        }
        Err(source) => {
            return Err(BackupError::RemoveArchive {
                path: archive_path.display().to_string(),
                source,
            });
        }
    }

    Ok(receipt)
}

async fn put_archive(store: &dyn ObjectStore, archive_path: &Path) -> Result<UploadReceipt> {
    let key = archive_path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Archive path has no usable file name: {}", archive_path.display()))?
        .to_string();

    let mut file = File::open(archive_path)
        .await
        .with_context(|| format!("Failed to open zipped backup: {}", archive_path.display()))?;

    let mut window = Vec::with_capacity(SNIFF_LEN);
    (&mut file)
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut window)
        .await
        .with_context(|| format!("Failed to read from archive: {}", archive_path.display()))?;
    let content_type = detect_content_type(&window);

    file.seek(SeekFrom::Start(0))
        .await
        .with_context(|| format!("Failed to seek to beginning of archive: {}", archive_path.display()))?;

    store.put_object(&key, content_type, file).await?;

    Ok(UploadReceipt {
        key,
        content_type: content_type.to_string(),
    })
}
