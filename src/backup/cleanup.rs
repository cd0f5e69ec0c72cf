// mongobackup/src/backup/cleanup.rs
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Removes every direct entry of `dir` (directories recursively), leaving `dir` itself.
///
/// Stops at the first entry that cannot be removed.
pub async fn clean_output_dir(dir: &Path) -> Result<usize> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list backup output directory: {}", dir.display()))?;

    let mut removed = 0usize;
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("Failed to read entry in {}", dir.display()))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?;

        let result = if file_type.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        result.with_context(|| format!("Failed to remove {}", path.display()))?;
        removed += 1;
    }

    info!(dir = %dir.display(), removed, "Backup output directory cleaned");
    Ok(removed)
}
