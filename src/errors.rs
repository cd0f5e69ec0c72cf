use thiserror::Error;

/// Failure of one backup run, tagged with the stage that stopped it.
///
/// Per-database dump failures are not listed here: they are collected in the
/// run report and never abort a run.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Failed to enumerate databases: {0:#}")]
    Enumerate(anyhow::Error),

    #[error("Failed to prepare output directory: {0:#}")]
    Prepare(anyhow::Error),

    #[error("Failed to archive backup folder: {0:#}")]
    Archive(anyhow::Error),

    #[error("Failed to upload archive: {0:#}")]
    Upload(anyhow::Error),

    #[error("Failed to remove local archive {path}: {source}")]
    RemoveArchive {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to clean backup output directory: {0:#}")]
    Cleanup(anyhow::Error),

    #[error("A backup run is already in progress")]
    AlreadyRunning,
}

impl BackupError {
    /// Short stage label used in log fields.
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Enumerate(_) => "enumerate",
            Self::Prepare(_) => "prepare",
            Self::Archive(_) => "archive",
            Self::Upload(_) => "upload",
            Self::RemoveArchive { .. } => "remove-archive",
            Self::Cleanup(_) => "cleanup",
            Self::AlreadyRunning => "trigger",
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
