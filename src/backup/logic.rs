// mongobackup/src/backup/logic.rs
use anyhow::Context;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use super::archive::{archive_file_name, create_tar_gz_archive};
use super::cleanup::clean_output_dir;
use super::db_dump::{DatabaseLister, DumpOutcome, DumpRunner, dump_databases, enumerate_databases};
use super::s3_upload::{ObjectStore, UploadReceipt, upload_archive};
use crate::errors::{BackupError, Result};

/// Summary of one completed run.
#[derive(Debug)]
pub struct RunReport {
    pub date: NaiveDate,
    pub dumps: Vec<DumpOutcome>,
    pub upload: UploadReceipt,
    pub cleaned_entries: usize,
}

impl RunReport {
    pub fn failed_databases(&self) -> Vec<&str> {
        self.dumps
            .iter()
            .filter(|o| !o.succeeded())
            .map(|o| o.database.as_str())
            .collect()
    }
}

/// The nightly back up, archive, upload and cleanup sequence.
pub struct BackupPipeline {
    lister: Arc<dyn DatabaseLister>,
    dumper: Arc<dyn DumpRunner>,
    store: Arc<dyn ObjectStore>,
    output_dir: PathBuf,
    archive_dir: PathBuf,
    running: AtomicBool,
}

// Clears the in-progress flag when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl BackupPipeline {
    /// `archive_dir` is where the dated archive is written before upload.
    pub fn new(
        lister: Arc<dyn DatabaseLister>,
        dumper: Arc<dyn DumpRunner>,
        store: Arc<dyn ObjectStore>,
        output_dir: impl Into<PathBuf>,
        archive_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            lister,
            dumper,
            store,
            output_dir: output_dir.into(),
            archive_dir: archive_dir.into(),
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs the whole sequence for `date`, refusing to start while another run is active.
    pub async fn run(&self, date: NaiveDate) -> Result<RunReport> {
        let _guard = RunGuard::acquire(&self.running).ok_or(BackupError::AlreadyRunning)?;
        info!(%date, "🚀 Starting backup run");

        let dumps = self.back_up().await?;
        let archive_path = self.archive(date).await?;
        let upload = upload_archive(self.store.as_ref(), &archive_path).await?;
        let cleaned_entries = clean_output_dir(&self.output_dir)
            .await
            .map_err(BackupError::Cleanup)?;

        let report = RunReport {
            date,
            dumps,
            upload,
            cleaned_entries,
        };
        let failed = report.failed_databases();
        if failed.is_empty() {
            info!(
                date = %report.date,
                key = %report.upload.key,
                databases = report.dumps.len(),
                cleaned = report.cleaned_entries,
                "✅ Backup run completed"
            );
        } else {
            warn!(%date, key = %report.upload.key, failed = ?failed, "Backup run completed with failed dumps");
        }
        Ok(report)
    }

    /// Enumerates databases and dumps each one into the output directory.
    async fn back_up(&self) -> Result<Vec<DumpOutcome>> {
        let databases = enumerate_databases(self.lister.as_ref())
            .await
            .map_err(BackupError::Enumerate)?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create backup output directory: {}",
                    self.output_dir.display()
                )
            })
            .map_err(BackupError::Prepare)?;

        // Leftovers from a run whose upload failed must not ride along in this archive.
        let stale = clean_output_dir(&self.output_dir)
            .await
            .map_err(BackupError::Prepare)?;
        if stale > 0 {
            warn!(
                dir = %self.output_dir.display(),
                removed = stale,
                "Removed leftover entries from a previous run before dumping"
            );
        }

        Ok(dump_databases(self.dumper.as_ref(), &databases, &self.output_dir).await)
    }

    async fn archive(&self, date: NaiveDate) -> Result<PathBuf> {
        let source = self.output_dir.clone();
        let dest = self.archive_dir.join(archive_file_name(date));

        tokio::task::spawn_blocking(move || create_tar_gz_archive(&source, &dest))
            .await
            .context("Archive task panicked")
            .and_then(|res| res)
            .map_err(BackupError::Archive)
    }
}
