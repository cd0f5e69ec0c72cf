// mongobackup/src/backup/archive.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tar::Builder;
use tracing::{info, warn};
use walkdir::WalkDir;

/// File name of the archive for a run on `date`; also used as the upload key.
pub fn archive_file_name(date: NaiveDate) -> String {
    format!("mongodb-dump-{}.tar.gz", date.format("%Y-%m-%d"))
}

/// Creates a GZipped TAR archive from a source directory.
///
/// Every file and directory below `source_dir` is recorded under its path relative
/// to `source_dir`, using `/` separators; the root itself gets no entry.
/// Any unreadable entry aborts the archive.
///
/// # Arguments
/// * `source_dir` - The directory whose contents will be archived.
/// * `archive_dest_path` - The full path where the `.tar.gz` archive will be created.
///
/// # Returns
/// Path to the created archive file.
pub fn create_tar_gz_archive(source_dir: &Path, archive_dest_path: &Path) -> Result<PathBuf> {
    if !source_dir.is_dir() {
        return Err(anyhow::anyhow!(
            "Source for archival is not a directory: {}",
            source_dir.display()
        ));
    }
    if let Some(parent) = archive_dest_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!(
                    "Failed to create parent directory for archive: {}",
                    parent.display()
                )
            })?;
        }
    }

    info!(
        source = %source_dir.display(),
        archive = %archive_dest_path.display(),
        "Creating tar.gz archive"
    );

    let archive_file = File::create(archive_dest_path).with_context(|| {
        format!(
            "Failed to create archive file: {}",
            archive_dest_path.display()
        )
    })?;
    let entries = match write_archive(source_dir, archive_file, archive_dest_path) {
        Ok(entries) => entries,
        Err(e) => {
            // A truncated archive must never be picked up later.
            if let Err(remove_err) = std::fs::remove_file(archive_dest_path) {
                warn!(
                    archive = %archive_dest_path.display(),
                    error = %remove_err,
                    "Failed to remove incomplete archive"
                );
            }
            return Err(e);
        }
    };

    info!(
        archive = %archive_dest_path.display(),
        entries,
        "✓ Tar.gz archive created successfully"
    );
    Ok(archive_dest_path.to_path_buf())
}

// Streams the tree into `archive_file`; returns the number of entries written.
fn write_archive(source_dir: &Path, archive_file: File, archive_dest_path: &Path) -> Result<usize> {
    let enc = GzEncoder::new(archive_file, Compression::default());
    let mut tar_builder = Builder::new(enc);
    tar_builder.follow_symlinks(false);

    let mut entries = 0usize;
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry
            .with_context(|| format!("Failed to walk directory: {}", source_dir.display()))?;
        let path = entry.path();
        let name = path.strip_prefix(source_dir).with_context(|| {
            format!(
                "Failed to strip prefix {} from {}",
                source_dir.display(),
                path.display()
            )
        })?;

        if name.as_os_str().is_empty() {
            continue;
        }
        let name = entry_name(name);

        if entry.file_type().is_dir() {
            // Directory entries carry a trailing separator.
            tar_builder.append_dir(format!("{name}/"), path).with_context(|| {
                format!("Failed to append directory {} to archive", path.display())
            })?;
        } else {
            let mut file = File::open(path)
                .with_context(|| format!("Failed to open {} for archiving", path.display()))?;
            tar_builder.append_file(&name, &mut file).with_context(|| {
                format!(
                    "Failed to append file {} as {} to archive",
                    path.display(),
                    name
                )
            })?;
        }
        entries += 1;
    }

    let encoder = tar_builder.into_inner().with_context(|| {
        format!(
            "Failed to get inner encoder from tar builder for archive: {}",
            archive_dest_path.display()
        )
    })?;

    encoder.finish().with_context(|| {
        format!(
            "Failed to finish Gzip encoding for archive: {}",
            archive_dest_path.display()
        )
    })?;

    Ok(entries)
}

// Archive entry names always use forward slashes, whatever the host separator.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
